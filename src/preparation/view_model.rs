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


//! File download preparation view model
//!
//! Drives one preparation session: enumerate the files of an exam or training,
//! download them, and expose start/cancel/retry/close with availability flags
//! derived from the current [`PreparationPhase`].
//!
//! All operations take `&self`, so a host can share the view model through an
//! `Arc` and cancel from one task while another awaits [`start_download`].
//! Every mutation publishes a [`PreparationSnapshot`] on a watch channel.
//!
//! Enumeration and download failures end up in the snapshot (`has_error`,
//! `error_message`) and never surface as `Err`. `Err` is reserved for commands
//! issued while unavailable.
//!
//! [`start_download`]: FileDownloadPreparationViewModel::start_download

use crate::download::progress::{FileProgress, ProgressReporter, TaskProgress};
use crate::download::service::FileDownloadService;
use crate::download::task::{FileDownloadTask, FileDownloadTaskStatus, FileDownloadTaskType};
use crate::error::{ExaminaError, Result};
use crate::preparation::state::{CommandAvailability, PreparationEvent, PreparationPhase};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const STATUS_IDLE: &str = "Waiting to start";
pub const STATUS_FETCHING: &str = "Fetching file list...";
pub const STATUS_NO_FILES: &str = "No files need to be downloaded";
pub const STATUS_LIST_FAILED: &str = "Failed to load the file list";
pub const STATUS_STARTING: &str = "Starting download...";
pub const STATUS_RETRYING: &str = "Retrying download...";
pub const STATUS_CANCELLING: &str = "Cancelling download...";
pub const STATUS_CLEANING_UP: &str = "Cleaning up temporary files...";
pub const STATUS_COMPLETED: &str = "Download completed";
pub const STATUS_CANCELLED: &str = "Download cancelled";
pub const STATUS_FAILED: &str = "Download failed";

/// Observable state of a preparation session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparationSnapshot {
    pub phase: PreparationPhase,

    pub task_name: String,
    pub task_type: Option<FileDownloadTaskType>,
    pub related_id: Option<i64>,

    pub status_message: String,
    pub error_message: Option<String>,

    /// Percentage complete (0.0 - 100.0)
    pub overall_progress: f64,

    pub total_file_count: usize,
    pub completed_file_count: usize,
    pub failed_file_count: usize,

    /// File currently being downloaded or extracted
    pub current_file: Option<FileProgress>,

    pub is_downloading: bool,
    pub is_completed: bool,
    pub has_error: bool,

    pub can_start_download: bool,
    pub can_cancel_download: bool,
    pub can_retry_download: bool,
    pub can_close: bool,

    /// Raised by [`FileDownloadPreparationViewModel::close`]; hosts dismiss
    /// their view when they see it
    pub close_requested: bool,
}

/// Identity of what is being prepared, kept for re-enumeration on retry
#[derive(Debug, Clone)]
struct PreparationRequest {
    task_name: String,
    task_type: FileDownloadTaskType,
    related_id: i64,
}

#[derive(Debug)]
struct PreparationState {
    phase: PreparationPhase,
    request: Option<PreparationRequest>,
    task: Option<FileDownloadTask>,
    total_file_count: usize,
    completed_file_count: usize,
    failed_file_count: usize,
    overall_progress: f64,
    status_message: String,
    error_message: Option<String>,
    current_file: Option<FileProgress>,
    cancel_token: Option<CancellationToken>,
    close_requested: bool,
}

impl PreparationState {
    fn new() -> Self {
        Self {
            phase: PreparationPhase::Idle,
            request: None,
            task: None,
            total_file_count: 0,
            completed_file_count: 0,
            failed_file_count: 0,
            overall_progress: 0.0,
            status_message: STATUS_IDLE.to_string(),
            error_message: None,
            current_file: None,
            cancel_token: None,
            close_requested: false,
        }
    }

    fn transition(&mut self, event: PreparationEvent) -> Result<()> {
        let next = self.phase.on(event).ok_or_else(|| {
            ExaminaError::invalid_state(format!("{:?} is not valid while {}", event, self.phase))
        })?;
        debug!(from = %self.phase, to = %next, ?event, "Preparation phase changed");
        self.phase = next;
        Ok(())
    }

    fn has_files(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| task.total_file_count() > 0)
            .unwrap_or(false)
    }

    fn availability(&self) -> CommandAvailability {
        CommandAvailability::for_phase(self.phase, self.has_files())
    }

    /// Copy counts and progress from the stored task
    fn sync_from_task(&mut self) {
        if let Some(task) = &self.task {
            self.total_file_count = task.total_file_count();
            self.completed_file_count = task.completed_file_count();
            self.failed_file_count = task.failed_file_count();
            self.overall_progress = task.overall_progress();
        }
    }

    fn snapshot(&self) -> PreparationSnapshot {
        let availability = self.availability();
        let request = self.request.as_ref();

        PreparationSnapshot {
            phase: self.phase,
            task_name: request.map(|r| r.task_name.clone()).unwrap_or_default(),
            task_type: request.map(|r| r.task_type),
            related_id: request.map(|r| r.related_id),
            status_message: self.status_message.clone(),
            error_message: self.error_message.clone(),
            overall_progress: self.overall_progress,
            total_file_count: self.total_file_count,
            completed_file_count: self.completed_file_count,
            failed_file_count: self.failed_file_count,
            current_file: self.current_file.clone(),
            is_downloading: self.phase.is_downloading(),
            is_completed: self.phase.is_completed(),
            has_error: self.phase.has_error(),
            can_start_download: availability.can_start_download,
            can_cancel_download: availability.can_cancel_download,
            can_retry_download: availability.can_retry_download,
            can_close: availability.can_close,
            close_requested: self.close_requested,
        }
    }
}

/// How a download attempt ended
#[derive(Debug)]
enum DownloadOutcome {
    Succeeded,
    Cancelled,
    Failed(String),
}

enum RetryPlan {
    Download,
    Enumerate(PreparationRequest),
}

/// Orchestrates one file preparation session over a [`FileDownloadService`]
pub struct FileDownloadPreparationViewModel {
    service: Arc<dyn FileDownloadService>,
    state: Mutex<PreparationState>,
    snapshots: watch::Sender<PreparationSnapshot>,
}

impl FileDownloadPreparationViewModel {
    pub fn new(service: Arc<dyn FileDownloadService>) -> Self {
        let state = PreparationState::new();
        let (snapshots, _) = watch::channel(state.snapshot());
        Self {
            service,
            state: Mutex::new(state),
            snapshots,
        }
    }

    /// Enumerate the files to prepare
    ///
    /// Zero files completes the session immediately. Enumeration errors are
    /// recorded in the snapshot. Fails only when a session is already busy.
    pub async fn initialize(
        &self,
        task_name: &str,
        task_type: FileDownloadTaskType,
        related_id: i64,
    ) -> Result<()> {
        {
            let mut state = self.lock_state();
            if state.phase.is_busy() {
                return Err(ExaminaError::invalid_state(format!(
                    "cannot list files while {}",
                    state.phase
                )));
            }
            state.transition(PreparationEvent::BeginEnumeration)?;
            state.request = Some(PreparationRequest {
                task_name: task_name.to_string(),
                task_type,
                related_id,
            });
            state.task = None;
            state.total_file_count = 0;
            state.completed_file_count = 0;
            state.failed_file_count = 0;
            state.overall_progress = 0.0;
            state.error_message = None;
            state.current_file = None;
            state.status_message = STATUS_FETCHING.to_string();
            self.publish(&state);
        }

        info!(task = task_name, %task_type, related_id, "Fetching file list");
        let result = self.service.get_files(related_id, task_type).await;

        let found = result.map(|files| {
            (!files.is_empty()).then(|| {
                self.service
                    .create_download_task(task_name, task_type, related_id, files)
            })
        });

        let mut state = self.lock_state();
        match found {
            Ok(Some(task)) => {
                let count = task.total_file_count();
                state.task = Some(task);
                state.sync_from_task();
                state.transition(PreparationEvent::FilesFound)?;
                state.status_message = if count == 1 {
                    "Found 1 file, ready to download".to_string()
                } else {
                    format!("Found {} files, ready to download", count)
                };
                info!(task = task_name, files = count, "Files ready to download");
            }
            Ok(None) => {
                state.transition(PreparationEvent::NoFiles)?;
                state.overall_progress = 100.0;
                state.status_message = STATUS_NO_FILES.to_string();
                info!(task = task_name, "No files to download");
            }
            Err(e) => {
                warn!(task = task_name, error = %e, "Failed to fetch file list");
                state.transition(PreparationEvent::EnumerationFailed)?;
                state.error_message = Some(e.user_message());
                state.status_message = STATUS_LIST_FAILED.to_string();
            }
        }
        self.publish(&state);
        Ok(())
    }

    /// Download all files of the current task and wait for the result
    ///
    /// Returns `Err(CommandUnavailable)` unless [`can_start_download`] holds.
    /// Success, cancellation and failure all return `Ok(())`; inspect the
    /// snapshot for the result.
    ///
    /// [`can_start_download`]: Self::can_start_download
    pub async fn start_download(&self) -> Result<()> {
        let (mut task, token) = {
            let mut state = self.lock_state();
            if !state.availability().can_start_download {
                return Err(ExaminaError::CommandUnavailable("start download"));
            }
            if state.task.is_none() {
                return Err(ExaminaError::internal("no download task to start"));
            }
            state.transition(PreparationEvent::DownloadStarted)?;
            // Files left over from a cancelled or failed attempt are fetched again,
            // and the published counts must start from the reset task
            if let Some(task) = state.task.as_mut().filter(|task| task.can_retry()) {
                task.reset_for_retry();
            }
            state.sync_from_task();
            let task = state
                .task
                .clone()
                .ok_or_else(|| ExaminaError::internal("no download task to start"))?;

            let token = CancellationToken::new();
            state.cancel_token = Some(token.clone());
            state.error_message = None;
            state.current_file = None;
            state.status_message = STATUS_STARTING.to_string();
            self.publish(&state);
            (task, token)
        };

        let guard = DownloadGuard {
            view_model: self,
            armed: true,
        };
        info!(task = %task.task_name, files = task.total_file_count(), "Starting download");

        let (reporter, mut receiver) = ProgressReporter::channel();
        let result = {
            let mut download = self
                .service
                .start_download_task(&mut task, &reporter, token.clone());
            loop {
                tokio::select! {
                    result = &mut download => break result,
                    Some(progress) = receiver.recv() => self.apply_progress(progress),
                }
            }
        };
        drop(reporter);
        while let Ok(progress) = receiver.try_recv() {
            self.apply_progress(progress);
        }

        let cancelled = token.is_cancelled()
            || matches!(&result, Err(e) if e.is_cancellation())
            || task.status == FileDownloadTaskStatus::Cancelled;

        let outcome = if cancelled {
            if task.status != FileDownloadTaskStatus::Cancelled {
                self.service.cancel_download_task(&mut task);
            }
            DownloadOutcome::Cancelled
        } else {
            match result {
                Ok(true) => {
                    self.set_status_message(STATUS_CLEANING_UP);
                    if let Err(e) = self.service.cleanup_temp_files(&task).await {
                        warn!(task = %task.task_name, error = %e, "Temporary file cleanup failed");
                    }
                    DownloadOutcome::Succeeded
                }
                Ok(false) => DownloadOutcome::Failed(
                    task.error_message
                        .clone()
                        .unwrap_or_else(|| STATUS_FAILED.to_string()),
                ),
                Err(e) => {
                    let message = e.user_message();
                    if task.status == FileDownloadTaskStatus::Running {
                        task.mark_failed(message.clone());
                    }
                    DownloadOutcome::Failed(message)
                }
            }
        };

        guard.disarm();
        self.finish_download(task, outcome)
    }

    /// Request cancellation of the running download
    pub fn cancel_download(&self) -> Result<()> {
        let mut state = self.lock_state();
        if !state.availability().can_cancel_download {
            return Err(ExaminaError::CommandUnavailable("cancel download"));
        }
        if let Some(token) = &state.cancel_token {
            token.cancel();
        }
        state.status_message = STATUS_CANCELLING.to_string();
        self.publish(&state);
        info!("Download cancellation requested");
        Ok(())
    }

    /// Clear the error and try again
    ///
    /// With a task, failed and cancelled files are reset and downloaded again.
    /// Without one (the file list could not be loaded), the list is fetched again.
    pub async fn retry_download(&self) -> Result<()> {
        let plan = {
            let mut state = self.lock_state();
            if !state.availability().can_retry_download {
                return Err(ExaminaError::CommandUnavailable("retry download"));
            }
            state.error_message = None;

            if state.has_files() {
                if let Some(task) = state.task.as_mut() {
                    let reset = task.reset_for_retry();
                    debug!(task = %task.task_name, reset, "Reset files for retry");
                }
                state.sync_from_task();
                state.transition(PreparationEvent::RetryRequested)?;
                state.status_message = STATUS_RETRYING.to_string();
                self.publish(&state);
                RetryPlan::Download
            } else {
                let request = state
                    .request
                    .clone()
                    .ok_or_else(|| ExaminaError::internal("nothing to retry"))?;
                RetryPlan::Enumerate(request)
            }
        };

        match plan {
            RetryPlan::Download => self.start_download().await,
            RetryPlan::Enumerate(request) => {
                self.initialize(&request.task_name, request.task_type, request.related_id)
                    .await
            }
        }
    }

    /// Ask the host to dismiss the view, cancelling a running download first
    pub fn close(&self) {
        let mut state = self.lock_state();
        if state.phase.is_downloading() {
            if let Some(token) = &state.cancel_token {
                token.cancel();
            }
            state.status_message = STATUS_CANCELLING.to_string();
            info!("Closing during download, cancelling first");
        }
        state.close_requested = true;
        self.publish(&state);
    }

    /// Wait until [`close`](Self::close) has been called
    pub async fn closed(&self) {
        let mut receiver = self.subscribe();
        let _ = receiver.wait_for(|snapshot| snapshot.close_requested).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<PreparationSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> PreparationSnapshot {
        self.lock_state().snapshot()
    }

    /// Copy of the current task, if files were found
    pub fn task(&self) -> Option<FileDownloadTask> {
        self.lock_state().task.clone()
    }

    pub fn phase(&self) -> PreparationPhase {
        self.lock_state().phase
    }

    pub fn is_downloading(&self) -> bool {
        self.phase().is_downloading()
    }

    pub fn is_completed(&self) -> bool {
        self.phase().is_completed()
    }

    pub fn has_error(&self) -> bool {
        self.phase().has_error()
    }

    pub fn can_start_download(&self) -> bool {
        self.lock_state().availability().can_start_download
    }

    pub fn can_cancel_download(&self) -> bool {
        self.lock_state().availability().can_cancel_download
    }

    pub fn can_retry_download(&self) -> bool {
        self.lock_state().availability().can_retry_download
    }

    pub fn can_close(&self) -> bool {
        self.lock_state().availability().can_close
    }

    pub fn status_message(&self) -> String {
        self.lock_state().status_message.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock_state().error_message.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, PreparationState> {
        // State stays consistent across a panicking holder
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &PreparationState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn set_status_message(&self, message: &str) {
        let mut state = self.lock_state();
        state.status_message = message.to_string();
        self.publish(&state);
    }

    fn apply_progress(&self, progress: TaskProgress) {
        let mut state = self.lock_state();
        if !state.phase.is_downloading() {
            return;
        }

        state.overall_progress = state.overall_progress.max(progress.overall_progress);
        state.total_file_count = progress.total_file_count;
        state.completed_file_count = progress.completed_file_count;
        state.failed_file_count = progress.failed_file_count;
        state.status_message = progress.status_message;
        state.current_file = progress.current_file;
        if progress.status == FileDownloadTaskStatus::Failed {
            state.error_message = progress.error_message;
        }
        self.publish(&state);
    }

    fn finish_download(&self, task: FileDownloadTask, outcome: DownloadOutcome) -> Result<()> {
        let mut state = self.lock_state();
        state.cancel_token = None;
        state.current_file = None;
        state.task = Some(task);
        state.sync_from_task();

        match outcome {
            DownloadOutcome::Succeeded => {
                state.transition(PreparationEvent::DownloadSucceeded)?;
                state.error_message = None;
                state.status_message = STATUS_COMPLETED.to_string();
                info!(files = state.completed_file_count, "All files prepared");
            }
            DownloadOutcome::Cancelled => {
                state.transition(PreparationEvent::DownloadCancelled)?;
                state.status_message = STATUS_CANCELLED.to_string();
                info!("Download cancelled");
            }
            DownloadOutcome::Failed(message) => {
                state.transition(PreparationEvent::DownloadFailed)?;
                warn!(error = %message, "Download failed");
                state.error_message = Some(message);
                state.status_message = STATUS_FAILED.to_string();
            }
        }
        self.publish(&state);
        Ok(())
    }
}

/// Returns the session to `Cancelled` if a download future is dropped before
/// it finishes
struct DownloadGuard<'a> {
    view_model: &'a FileDownloadPreparationViewModel,
    armed: bool,
}

impl DownloadGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.view_model.lock_state();
        if let Some(token) = state.cancel_token.take() {
            token.cancel();
        }
        if let Some(task) = state.task.as_mut() {
            task.mark_cancelled();
        }
        state.sync_from_task();
        state.current_file = None;
        if state.transition(PreparationEvent::DownloadCancelled).is_ok() {
            state.status_message = STATUS_CANCELLED.to_string();
        }
        self.view_model.publish(&state);
        warn!("Download abandoned before it finished");
    }
}
