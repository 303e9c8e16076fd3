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


//! Download models, progress reporting and the download service
//!
//! - [`task`] - file and task models with progress roll-up
//! - [`progress`] - progress snapshots, reporter channel, throttling
//! - [`service`] - the [`FileDownloadService`] contract
//! - [`http_service`] - HTTP implementation against the Examina web API

pub mod http_service;
pub mod progress;
pub mod service;
pub mod task;

// Re-export commonly used types
pub use http_service::HttpFileDownloadService;
pub use progress::{FileProgress, ProgressReporter, TaskProgress};
pub use service::FileDownloadService;
pub use task::{
    FileDownloadInfo, FileDownloadStatus, FileDownloadTask, FileDownloadTaskStatus,
    FileDownloadTaskType,
};
