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


//! Download task and file models
//!
//! A [`FileDownloadTask`] is created once per preparation session and holds the
//! ordered list of [`FileDownloadInfo`] entries for one exam or training.
//!
//! # Invariants
//! - `completed_file_count() + failed_file_count() <= files().len()`
//! - `overall_progress()` is recomputed after every per-file mutation and never
//!   decreases while the task is `Running`
//! - A file's `download_url` never changes after construction

use crate::download::progress::{format_file_size, format_time_span};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Status of a single file in a download task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileDownloadStatus {
    /// Waiting to be downloaded
    Pending,
    /// Bytes are being transferred
    Downloading,
    /// Transfer finished, post-processing not started yet
    Downloaded,
    /// Archive is being unpacked
    Extracting,
    /// File is ready for use
    Completed,
    /// Transfer or extraction failed
    Failed,
    /// Stopped by the user
    Cancelled,
}

impl FileDownloadStatus {
    /// Human-readable status name
    pub fn display_name(&self) -> &'static str {
        match self {
            FileDownloadStatus::Pending => "Pending",
            FileDownloadStatus::Downloading => "Downloading",
            FileDownloadStatus::Downloaded => "Downloaded",
            FileDownloadStatus::Extracting => "Extracting",
            FileDownloadStatus::Completed => "Completed",
            FileDownloadStatus::Failed => "Failed",
            FileDownloadStatus::Cancelled => "Cancelled",
        }
    }

    /// Style class used by hosts to color a status badge
    pub fn css_class(&self) -> &'static str {
        match self {
            FileDownloadStatus::Pending => "status-pending",
            FileDownloadStatus::Downloading
            | FileDownloadStatus::Downloaded
            | FileDownloadStatus::Extracting => "status-downloading",
            FileDownloadStatus::Completed => "status-completed",
            FileDownloadStatus::Failed | FileDownloadStatus::Cancelled => "status-failed",
        }
    }

    /// True once the bytes are on disk
    pub fn is_transferred(&self) -> bool {
        matches!(
            self,
            FileDownloadStatus::Downloaded
                | FileDownloadStatus::Extracting
                | FileDownloadStatus::Completed
        )
    }
}

impl fmt::Display for FileDownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Status of a whole download task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileDownloadTaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl FileDownloadTaskStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            FileDownloadTaskStatus::Pending => "Pending",
            FileDownloadTaskStatus::Running => "Running",
            FileDownloadTaskStatus::Completed => "Completed",
            FileDownloadTaskStatus::Failed => "Failed",
            FileDownloadTaskStatus::Cancelled => "Cancelled",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            FileDownloadTaskStatus::Pending => "status-pending",
            FileDownloadTaskStatus::Running => "status-downloading",
            FileDownloadTaskStatus::Completed => "status-completed",
            FileDownloadTaskStatus::Failed | FileDownloadTaskStatus::Cancelled => "status-failed",
        }
    }
}

impl fmt::Display for FileDownloadTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a download task prepares files for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileDownloadTaskType {
    /// Non-scored practice exam
    MockExam,
    /// Scheduled, proctored exam
    OnlineExam,
    ComprehensiveTraining,
    SpecializedTraining,
}

impl FileDownloadTaskType {
    pub const ALL: [FileDownloadTaskType; 4] = [
        FileDownloadTaskType::MockExam,
        FileDownloadTaskType::OnlineExam,
        FileDownloadTaskType::ComprehensiveTraining,
        FileDownloadTaskType::SpecializedTraining,
    ];

    /// Exams list their files through the exam endpoint, trainings through
    /// their own endpoints
    pub fn is_exam(&self) -> bool {
        matches!(
            self,
            FileDownloadTaskType::MockExam | FileDownloadTaskType::OnlineExam
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FileDownloadTaskType::MockExam => "Mock exam",
            FileDownloadTaskType::OnlineExam => "Online exam",
            FileDownloadTaskType::ComprehensiveTraining => "Comprehensive training",
            FileDownloadTaskType::SpecializedTraining => "Specialized training",
        }
    }

    /// Folder below the download root holding this type's files
    pub fn folder_name(&self) -> &'static str {
        match self {
            FileDownloadTaskType::MockExam => "MockExams",
            FileDownloadTaskType::OnlineExam => "OnlineExams",
            FileDownloadTaskType::ComprehensiveTraining => "ComprehensiveTraining",
            FileDownloadTaskType::SpecializedTraining => "SpecializedTraining",
        }
    }

    /// Kebab-case identifier, as accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileDownloadTaskType::MockExam => "mock-exam",
            FileDownloadTaskType::OnlineExam => "online-exam",
            FileDownloadTaskType::ComprehensiveTraining => "comprehensive-training",
            FileDownloadTaskType::SpecializedTraining => "specialized-training",
        }
    }
}

impl fmt::Display for FileDownloadTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FileDownloadTaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        FileDownloadTaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized || t.folder_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown task type '{}', expected one of: mock-exam, online-exam, comprehensive-training, specialized-training",
                    s
                )
            })
    }
}

/// One remote file attached to an exam or training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadInfo {
    /// Server-side file id, if the listing provided one
    pub file_id: Option<i64>,

    /// Name the file is saved under
    pub file_name: String,

    /// Absolute URL the file is fetched from
    download_url: String,

    /// Size in bytes as reported by the server (0 if unknown)
    pub total_size: u64,

    /// Bytes written to disk so far
    pub downloaded_size: u64,

    pub status: FileDownloadStatus,

    /// Short text shown next to the file
    pub status_message: String,

    /// Where the file is written
    pub local_file_path: Option<PathBuf>,

    /// Whether the file is an archive to unpack after download
    pub is_compressed: bool,

    /// Directory an archive is unpacked into
    pub extract_path: Option<PathBuf>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub error_message: Option<String>,

    /// Hex MD5 or SHA-256 digest to validate against, if published
    pub expected_hash: Option<String>,

    /// Moving-average transfer speed in bytes per second
    pub download_speed: f64,

    /// MIME type reported by the server
    pub content_type: Option<String>,
}

impl FileDownloadInfo {
    /// Create a pending file entry
    pub fn new(file_name: impl Into<String>, download_url: impl Into<String>, total_size: u64) -> Self {
        Self {
            file_id: None,
            file_name: file_name.into(),
            download_url: download_url.into(),
            total_size,
            downloaded_size: 0,
            status: FileDownloadStatus::Pending,
            status_message: "Waiting to download".to_string(),
            local_file_path: None,
            is_compressed: false,
            extract_path: None,
            start_time: None,
            end_time: None,
            error_message: None,
            expected_hash: None,
            download_speed: 0.0,
            content_type: None,
        }
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    /// Progress of this file, 0.0 - 100.0
    ///
    /// Counts as 100 once the bytes are on disk so that extraction does not
    /// pull the overall figure back down.
    pub fn progress(&self) -> f64 {
        if self.status.is_transferred() {
            return 100.0;
        }
        if self.total_size == 0 {
            return 0.0;
        }
        ((self.downloaded_size as f64 / self.total_size as f64) * 100.0).min(100.0)
    }

    /// Move to a new status, stamping start/end times
    pub fn set_status(&mut self, status: FileDownloadStatus, message: impl Into<String>) {
        match status {
            FileDownloadStatus::Downloading if self.start_time.is_none() => {
                self.start_time = Some(Utc::now());
            }
            FileDownloadStatus::Completed
            | FileDownloadStatus::Failed
            | FileDownloadStatus::Cancelled => {
                self.end_time = Some(Utc::now());
            }
            _ => {}
        }
        self.status = status;
        self.status_message = message.into();
    }

    /// Mark the file as failed with an error message
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.set_status(FileDownloadStatus::Failed, format!("Failed: {}", error));
        self.error_message = Some(error);
    }

    /// Reset a failed or cancelled file so it is fetched again.
    /// Returns true if the file was reset.
    pub fn reset_for_retry(&mut self) -> bool {
        if !matches!(
            self.status,
            FileDownloadStatus::Failed | FileDownloadStatus::Cancelled
        ) {
            return false;
        }
        self.status = FileDownloadStatus::Pending;
        self.status_message = "Waiting to download".to_string();
        self.downloaded_size = 0;
        self.download_speed = 0.0;
        self.start_time = None;
        self.end_time = None;
        self.error_message = None;
        true
    }

    /// Wall-clock time spent on this file so far
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - start).to_std().ok()
    }

    /// Transfer speed: the moving average if known, else bytes over elapsed time
    pub fn average_speed(&self) -> f64 {
        if self.download_speed > 0.0 {
            return self.download_speed;
        }
        match self.elapsed() {
            Some(elapsed) if elapsed.as_secs_f64() > 0.0 => {
                self.downloaded_size as f64 / elapsed.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    /// Estimated time to finish the transfer
    pub fn eta(&self) -> Option<Duration> {
        let speed = self.average_speed();
        if speed <= 0.0 || self.total_size == 0 || self.status != FileDownloadStatus::Downloading {
            return None;
        }
        let remaining = self.total_size.saturating_sub(self.downloaded_size);
        // A near-zero speed can push the estimate past what Duration holds
        Duration::try_from_secs_f64(remaining as f64 / speed).ok()
    }

    /// Format total size (e.g., "12.5 MB")
    pub fn size_string(&self) -> String {
        format_file_size(self.total_size)
    }

    /// Format transferred/total (e.g., "1.5 MB / 12.5 MB")
    pub fn transferred_string(&self) -> String {
        format!(
            "{} / {}",
            format_file_size(self.downloaded_size),
            format_file_size(self.total_size)
        )
    }

    /// Format speed (e.g., "2.5 MB/s")
    pub fn speed_string(&self) -> String {
        format!("{}/s", format_file_size(self.average_speed() as u64))
    }

    /// Format ETA (e.g., "03:20"), "unknown" when there is no estimate
    pub fn eta_string(&self) -> String {
        self.eta()
            .map(format_time_span)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Named, ordered set of files prepared for one exam or training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadTask {
    pub task_id: Uuid,

    pub task_name: String,

    pub task_type: FileDownloadTaskType,

    /// Id of the exam or training the files belong to
    pub related_id: i64,

    files: Vec<FileDownloadInfo>,

    pub status: FileDownloadTaskStatus,

    pub status_message: String,

    overall_progress: f64,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub error_message: Option<String>,
}

impl FileDownloadTask {
    pub fn new(task_name: impl Into<String>, task_type: FileDownloadTaskType, related_id: i64) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            task_name: task_name.into(),
            task_type,
            related_id,
            files: Vec::new(),
            status: FileDownloadTaskStatus::Pending,
            status_message: "Ready".to_string(),
            overall_progress: 0.0,
            start_time: None,
            end_time: None,
            error_message: None,
        }
    }

    pub fn with_files(mut self, files: Vec<FileDownloadInfo>) -> Self {
        for file in files {
            self.add_file(file);
        }
        self
    }

    pub fn files(&self) -> &[FileDownloadInfo] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&FileDownloadInfo> {
        self.files.get(index)
    }

    pub fn add_file(&mut self, file: FileDownloadInfo) {
        self.files.push(file);
        self.update_overall_progress();
    }

    /// Remove the file with the given download URL. Returns it if found.
    pub fn remove_file(&mut self, download_url: &str) -> Option<FileDownloadInfo> {
        let index = self.files.iter().position(|f| f.download_url == download_url)?;
        let removed = self.files.remove(index);
        self.update_overall_progress();
        Some(removed)
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
        self.overall_progress = 0.0;
    }

    /// Mutate one file and recompute the roll-up.
    /// Returns `None` if the index is out of range.
    pub fn update_file<R>(&mut self, index: usize, f: impl FnOnce(&mut FileDownloadInfo) -> R) -> Option<R> {
        let file = self.files.get_mut(index)?;
        let result = f(file);
        self.update_overall_progress();
        Some(result)
    }

    /// Recompute overall progress as the mean of per-file progress
    pub fn update_overall_progress(&mut self) {
        let computed = if self.files.is_empty() {
            0.0
        } else {
            self.files.iter().map(FileDownloadInfo::progress).sum::<f64>() / self.files.len() as f64
        };

        self.overall_progress = if self.status == FileDownloadTaskStatus::Running {
            self.overall_progress.max(computed)
        } else {
            computed
        };
    }

    pub fn overall_progress(&self) -> f64 {
        self.overall_progress
    }

    pub fn total_file_count(&self) -> usize {
        self.files.len()
    }

    pub fn completed_file_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileDownloadStatus::Completed)
            .count()
    }

    pub fn failed_file_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileDownloadStatus::Failed)
            .count()
    }

    /// Sum of server-reported sizes
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.total_size).sum()
    }

    pub fn can_cancel(&self) -> bool {
        self.status == FileDownloadTaskStatus::Running
    }

    pub fn can_retry(&self) -> bool {
        matches!(
            self.status,
            FileDownloadTaskStatus::Failed | FileDownloadTaskStatus::Cancelled
        )
    }

    pub fn mark_running(&mut self) {
        self.status = FileDownloadTaskStatus::Running;
        self.status_message = "Downloading...".to_string();
        self.start_time = Some(Utc::now());
        self.end_time = None;
        self.error_message = None;
    }

    pub fn mark_completed(&mut self) {
        self.status = FileDownloadTaskStatus::Completed;
        self.status_message = "All files are ready".to_string();
        self.end_time = Some(Utc::now());
        self.update_overall_progress();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = FileDownloadTaskStatus::Failed;
        self.status_message = error.clone();
        self.error_message = Some(error);
        self.end_time = Some(Utc::now());
    }

    /// Mark the task and every unfinished file as cancelled
    pub fn mark_cancelled(&mut self) {
        self.status = FileDownloadTaskStatus::Cancelled;
        self.status_message = "Download cancelled".to_string();
        self.end_time = Some(Utc::now());
        for file in self.files.iter_mut() {
            if matches!(
                file.status,
                FileDownloadStatus::Pending
                    | FileDownloadStatus::Downloading
                    | FileDownloadStatus::Downloaded
                    | FileDownloadStatus::Extracting
            ) {
                file.set_status(FileDownloadStatus::Cancelled, "Cancelled");
            }
        }
        self.update_overall_progress();
    }

    /// Reset failed and cancelled files and return the task to `Pending`.
    /// Completed files are kept. Returns the number of files reset.
    pub fn reset_for_retry(&mut self) -> usize {
        let reset = self
            .files
            .iter_mut()
            .map(FileDownloadInfo::reset_for_retry)
            .filter(|reset| *reset)
            .count();
        self.status = FileDownloadTaskStatus::Pending;
        self.status_message = "Ready".to_string();
        self.error_message = None;
        self.start_time = None;
        self.end_time = None;
        self.update_overall_progress();
        reset
    }

    /// First file that still needs work, in list order
    pub fn next_pending_index(&self) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.status == FileDownloadStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_files(sizes: &[u64]) -> FileDownloadTask {
        let files = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                FileDownloadInfo::new(format!("file{}.docx", i), format!("http://localhost/f/{}", i), *size)
            })
            .collect();
        FileDownloadTask::new("Mock exam: Office", FileDownloadTaskType::MockExam, 7).with_files(files)
    }

    #[test]
    fn test_file_progress() {
        let mut file = FileDownloadInfo::new("a.zip", "http://localhost/a.zip", 1000);
        assert_eq!(file.progress(), 0.0);

        file.downloaded_size = 250;
        assert!((file.progress() - 25.0).abs() < 0.01);

        file.set_status(FileDownloadStatus::Extracting, "Extracting");
        assert_eq!(file.progress(), 100.0);
    }

    #[test]
    fn test_unknown_size_progress() {
        let mut file = FileDownloadInfo::new("a.bin", "http://localhost/a.bin", 0);
        file.downloaded_size = 4096;
        assert_eq!(file.progress(), 0.0);
        file.set_status(FileDownloadStatus::Completed, "Done");
        assert_eq!(file.progress(), 100.0);
    }

    #[test]
    fn test_overall_progress_is_mean() {
        let mut task = task_with_files(&[100, 100]);
        task.update_file(0, |f| f.downloaded_size = 100);
        assert!((task.overall_progress() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_overall_progress_never_decreases_while_running() {
        let mut task = task_with_files(&[100, 100]);
        task.mark_running();
        task.update_file(0, |f| f.downloaded_size = 80);
        let before = task.overall_progress();

        // A server restarting a stream would report fewer bytes
        task.update_file(0, |f| f.downloaded_size = 10);
        assert!(task.overall_progress() >= before);
    }

    #[test]
    fn test_counts() {
        let mut task = task_with_files(&[10, 10, 10]);
        task.update_file(0, |f| f.set_status(FileDownloadStatus::Completed, "Done"));
        task.update_file(1, |f| f.mark_failed("boom"));

        assert_eq!(task.completed_file_count(), 1);
        assert_eq!(task.failed_file_count(), 1);
        assert!(task.completed_file_count() + task.failed_file_count() <= task.total_file_count());
    }

    #[test]
    fn test_reset_for_retry_keeps_completed_files() {
        let mut task = task_with_files(&[10, 10, 10]);
        task.mark_running();
        task.update_file(0, |f| f.set_status(FileDownloadStatus::Completed, "Done"));
        task.update_file(1, |f| {
            f.downloaded_size = 5;
            f.mark_failed("connection reset");
        });
        task.mark_failed("File download failed: file1.docx");
        assert!(task.can_retry());

        let reset = task.reset_for_retry();
        assert_eq!(reset, 1);
        assert_eq!(task.status, FileDownloadTaskStatus::Pending);
        assert_eq!(task.files()[0].status, FileDownloadStatus::Completed);
        assert_eq!(task.files()[1].status, FileDownloadStatus::Pending);
        assert_eq!(task.files()[1].downloaded_size, 0);
        assert!(task.error_message.is_none());
        assert_eq!(task.next_pending_index(), Some(1));
    }

    #[test]
    fn test_mark_cancelled_touches_unfinished_files_only() {
        let mut task = task_with_files(&[10, 10]);
        task.mark_running();
        task.update_file(0, |f| f.set_status(FileDownloadStatus::Completed, "Done"));
        task.mark_cancelled();

        assert_eq!(task.files()[0].status, FileDownloadStatus::Completed);
        assert_eq!(task.files()[1].status, FileDownloadStatus::Cancelled);
        assert!(!task.can_cancel());
        assert!(task.can_retry());
    }

    #[test]
    fn test_remove_file_by_url() {
        let mut task = task_with_files(&[10, 10]);
        let removed = task.remove_file("http://localhost/f/0").unwrap();
        assert_eq!(removed.file_name, "file0.docx");
        assert_eq!(task.total_file_count(), 1);
        assert!(task.remove_file("http://localhost/missing").is_none());
    }

    #[test]
    fn test_task_type_parsing() {
        assert_eq!("mock-exam".parse::<FileDownloadTaskType>().unwrap(), FileDownloadTaskType::MockExam);
        assert_eq!(
            "Specialized_Training".parse::<FileDownloadTaskType>().unwrap(),
            FileDownloadTaskType::SpecializedTraining
        );
        assert_eq!("OnlineExams".parse::<FileDownloadTaskType>().unwrap(), FileDownloadTaskType::OnlineExam);
        assert!("homework".parse::<FileDownloadTaskType>().is_err());
    }

    #[test]
    fn test_status_css_classes() {
        assert_eq!(FileDownloadStatus::Extracting.css_class(), "status-downloading");
        assert_eq!(FileDownloadTaskStatus::Cancelled.css_class(), "status-failed");
    }

    #[test]
    fn test_display_strings() {
        let mut file = FileDownloadInfo::new("a.zip", "http://localhost/a.zip", 2048);
        file.downloaded_size = 1024;
        file.download_speed = 1536.0;
        assert_eq!(file.transferred_string(), "1 KB / 2 KB");
        assert_eq!(file.speed_string(), "1.5 KB/s");
        // Only a running transfer has an estimate
        assert_eq!(file.eta_string(), "unknown");

        let mut file = FileDownloadInfo::new("b.pdf", "http://localhost/b.pdf", 3);
        file.set_status(FileDownloadStatus::Downloading, "Downloading");
        file.downloaded_size = 1;
        file.download_speed = 1.0;
        assert_eq!(file.eta(), Some(Duration::from_secs(2)));
        assert_eq!(file.eta_string(), "00:02");
    }

    #[test]
    fn test_eta_out_of_range_is_unknown() {
        let mut file = FileDownloadInfo::new("huge.iso", "http://localhost/huge.iso", u64::MAX);
        file.set_status(FileDownloadStatus::Downloading, "Downloading");
        file.download_speed = 1e-300;
        assert_eq!(file.eta(), None);
        assert_eq!(file.eta_string(), "unknown");
    }

    #[test]
    fn test_clear_files() {
        let mut task = task_with_files(&[100, 100]);
        task.update_file(0, |f| f.downloaded_size = 100);
        assert!(task.overall_progress() > 0.0);

        task.clear_files();
        assert_eq!(task.total_file_count(), 0);
        assert_eq!(task.overall_progress(), 0.0);
        assert_eq!(task.total_size(), 0);
    }
}
