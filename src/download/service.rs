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


//! Download service contract
//!
//! The preparation view model only talks to this trait, so hosts can plug in
//! the HTTP implementation ([`crate::download::HttpFileDownloadService`]) or a
//! scripted one in tests.

use crate::download::progress::ProgressReporter;
use crate::download::task::{FileDownloadInfo, FileDownloadTask, FileDownloadTaskType};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Enumerates, fetches, cancels and cleans up exam and training files
#[async_trait]
pub trait FileDownloadService: Send + Sync {
    /// List the files attached to an exam
    async fn get_exam_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>>;

    /// List the files attached to a training
    async fn get_training_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>>;

    /// Build a task for the given files, assigning their local paths
    fn create_download_task(
        &self,
        task_name: &str,
        task_type: FileDownloadTaskType,
        related_id: i64,
        files: Vec<FileDownloadInfo>,
    ) -> FileDownloadTask;

    /// Download every pending file of the task.
    ///
    /// Returns `Ok(true)` when all files are ready, `Ok(false)` when a file
    /// failed (the task carries the error message), and `Err(Cancelled)` when
    /// `cancel` fired. Progress is sent through `progress` as the task changes.
    async fn start_download_task(
        &self,
        task: &mut FileDownloadTask,
        progress: &ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<bool>;

    /// Mark the task and its unfinished files as cancelled
    fn cancel_download_task(&self, task: &mut FileDownloadTask) {
        task.mark_cancelled();
    }

    /// Remove temporary files (extracted archives) left by a finished task
    async fn cleanup_temp_files(&self, task: &FileDownloadTask) -> Result<()>;

    /// Directory files for the given exam or training are stored in
    fn download_directory(&self, task_type: FileDownloadTaskType, related_id: i64) -> PathBuf;

    /// List files through the endpoint matching the task type
    async fn get_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>> {
        if task_type.is_exam() {
            self.get_exam_files(related_id, task_type).await
        } else {
            self.get_training_files(related_id, task_type).await
        }
    }
}
