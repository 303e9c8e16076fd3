// Examina Client Core - Exam and Training File Preparation
// Copyright (C) 2025 Examina contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Examina client core
//!
//! Prepares the files a student needs before sitting an exam or following a
//! training: list them on the server, download them to a per-exam folder,
//! unpack archives, and report progress to the host UI.
//!
//! ```no_run
//! use std::sync::Arc;
//! use examina_core::{DownloadConfig, FileDownloadTaskType, HttpFileDownloadService};
//! use examina_core::preparation::FileDownloadPreparationViewModel;
//!
//! # async fn run() -> examina_core::Result<()> {
//! let service = Arc::new(HttpFileDownloadService::new(DownloadConfig::default())?);
//! let view_model = FileDownloadPreparationViewModel::new(service);
//! view_model
//!     .initialize("Mock exam: Algebra I", FileDownloadTaskType::MockExam, 42)
//!     .await?;
//! if view_model.can_start_download() {
//!     view_model.start_download().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod file;
pub mod preparation;

pub use config::DownloadConfig;
pub use download::{
    FileDownloadInfo, FileDownloadService, FileDownloadStatus, FileDownloadTask,
    FileDownloadTaskStatus, FileDownloadTaskType, HttpFileDownloadService, ProgressReporter,
    TaskProgress,
};
pub use error::{ExaminaError, Result};
pub use preparation::{FileDownloadPreparationViewModel, PreparationPhase, PreparationSnapshot};
