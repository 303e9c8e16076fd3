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


//! Download progress tracking and reporting
//!
//! # Progress Information
//! - Task-level roll-up: overall percentage, completed/failed counts
//! - The file currently being worked on, with its moving-average speed
//! - Status text for display
//!
//! Progress flows from the downloading service to whoever drives the task over
//! an unbounded channel ([`ProgressReporter`]). Byte-level updates are throttled
//! by [`ProgressThrottle`]; status changes are always reported.

use crate::download::task::{
    FileDownloadStatus, FileDownloadTask, FileDownloadTaskStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Snapshot of the file currently in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProgress {
    /// Position of the file in the task
    pub index: usize,

    pub file_name: String,

    pub status: FileDownloadStatus,

    pub downloaded_size: u64,

    /// Total bytes (0 if unknown)
    pub total_size: u64,

    /// Percentage complete (0.0 - 100.0)
    pub progress: f64,

    /// Current speed in bytes per second
    pub download_speed: f64,

    /// Estimated seconds remaining, if known
    pub eta_seconds: Option<u64>,
}

/// Progress snapshot for a whole task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: Uuid,

    pub status: FileDownloadTaskStatus,

    pub status_message: String,

    /// Percentage complete (0.0 - 100.0)
    pub overall_progress: f64,

    pub total_file_count: usize,
    pub completed_file_count: usize,
    pub failed_file_count: usize,

    pub current_file: Option<FileProgress>,

    pub error_message: Option<String>,
}

impl TaskProgress {
    /// Capture the task's current state, optionally focused on one file
    pub fn from_task(task: &FileDownloadTask, current: Option<usize>) -> Self {
        let current_file = current.and_then(|index| {
            task.file(index).map(|file| FileProgress {
                index,
                file_name: file.file_name.clone(),
                status: file.status,
                downloaded_size: file.downloaded_size,
                total_size: file.total_size,
                progress: file.progress(),
                download_speed: file.average_speed(),
                eta_seconds: file.eta().map(|eta| eta.as_secs()),
            })
        });

        Self {
            task_id: task.task_id,
            status: task.status,
            status_message: task.status_message.clone(),
            overall_progress: task.overall_progress(),
            total_file_count: task.total_file_count(),
            completed_file_count: task.completed_file_count(),
            failed_file_count: task.failed_file_count(),
            current_file,
            error_message: task.error_message.clone(),
        }
    }

    /// Format progress as display string
    pub fn display_string(&self) -> String {
        match &self.current_file {
            Some(file) if file.status == FileDownloadStatus::Downloading => format!(
                "{:.1}% [{}/{}] {}: {} / {} - {}/s - {}",
                self.overall_progress,
                self.completed_file_count,
                self.total_file_count,
                file.file_name,
                format_file_size(file.downloaded_size),
                format_file_size(file.total_size),
                format_file_size(file.download_speed as u64),
                file.eta_seconds
                    .map(|s| format_time_span(Duration::from_secs(s)))
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            _ => format!(
                "{:.1}% [{}/{}] {}",
                self.overall_progress,
                self.completed_file_count,
                self.total_file_count,
                self.status_message
            ),
        }
    }
}

/// Sending half of a progress channel handed to the download service
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: mpsc::UnboundedSender<TaskProgress>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver the orchestrator drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskProgress>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Reporter whose updates go nowhere
    pub fn disabled() -> Self {
        let (reporter, _receiver) = Self::channel();
        reporter
    }

    /// Report the task's current state. A closed receiver is ignored.
    pub fn report(&self, task: &FileDownloadTask, current: Option<usize>) {
        let _ = self.sender.send(TaskProgress::from_task(task, current));
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Speed tracker with moving average
///
/// Uses a sliding window approach to smooth out network fluctuations
#[derive(Debug)]
pub struct SpeedTracker {
    /// Samples within the time window
    samples: VecDeque<SpeedSample>,

    /// Time window for averaging (default 10 seconds)
    window_duration: Duration,
}

#[derive(Debug, Clone)]
struct SpeedSample {
    timestamp: Instant,

    /// Total bytes at this point in time
    position: u64,
}

impl SpeedTracker {
    /// Create new speed tracker with default 10-second window
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(10))
    }

    pub fn with_window(window_duration: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window_duration,
        }
    }

    /// Add a position sample (total bytes downloaded so far)
    pub fn add_position(&mut self, position: u64) {
        let now = Instant::now();

        self.samples.push_back(SpeedSample {
            timestamp: now,
            position,
        });

        // Keep at least two samples so a stalled stream still has a baseline
        while self.samples.len() > 2 {
            match self.samples.front() {
                Some(sample) if now.duration_since(sample.timestamp) > self.window_duration => {
                    self.samples.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Get current average speed in bytes per second
    pub fn average_speed(&self) -> f64 {
        let (first, last) = match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) if self.samples.len() >= 2 => (first, last),
            _ => return 0.0,
        };

        let bytes_delta = last.position.saturating_sub(first.position);
        let time_delta = last.timestamp.duration_since(first.timestamp).as_secs_f64();

        if time_delta > 0.0 {
            bytes_delta as f64 / time_delta
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

impl Default for SpeedTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Throttle for byte-level progress reports
#[derive(Debug)]
pub struct ProgressThrottle {
    speed_tracker: SpeedTracker,

    /// Last report time, `None` before the first report
    last_update: Option<Instant>,

    /// Minimum interval between reports (e.g., 200ms)
    update_interval: Duration,
}

impl ProgressThrottle {
    pub fn new(update_interval: Duration) -> Self {
        Self {
            speed_tracker: SpeedTracker::new(),
            last_update: None,
            update_interval,
        }
    }

    /// Record a new position.
    ///
    /// Returns true if enough time has passed and a report should be sent
    pub fn update(&mut self, bytes_downloaded: u64) -> bool {
        self.speed_tracker.add_position(bytes_downloaded);

        let now = Instant::now();
        match self.last_update {
            Some(last) if now.duration_since(last) < self.update_interval => false,
            _ => {
                self.last_update = Some(now);
                true
            }
        }
    }

    pub fn average_speed(&self) -> f64 {
        self.speed_tracker.average_speed()
    }

    /// Start tracking a new file
    pub fn reset(&mut self) {
        self.speed_tracker.reset();
        self.last_update = None;
    }
}

/// Format a byte count with binary units (e.g., "1.5 KB", "12 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let number = format!("{:.2}", size);
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, UNITS[unit])
}

/// Format a duration as `HH:MM:SS`, or `MM:SS` below one hour
pub fn format_time_span(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::task::{FileDownloadInfo, FileDownloadTaskType};
    use std::thread;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn test_format_time_span() {
        assert_eq!(format_time_span(Duration::from_secs(0)), "00:00");
        assert_eq!(format_time_span(Duration::from_secs(200)), "03:20");
        assert_eq!(format_time_span(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn test_speed_tracker() {
        let mut tracker = SpeedTracker::new();

        tracker.add_position(0);
        thread::sleep(Duration::from_millis(100));
        tracker.add_position(100_000);

        let speed = tracker.average_speed();
        assert!(speed > 0.0);
        assert!(speed < 2_000_000.0);
    }

    #[test]
    fn test_throttle_first_update_passes() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
        assert!(throttle.update(10));
        assert!(!throttle.update(20));

        throttle.reset();
        assert!(throttle.update(0));
    }

    #[test]
    fn test_reporter_sends_snapshot() {
        let task = FileDownloadTask::new("Online exam: Excel", FileDownloadTaskType::OnlineExam, 3)
            .with_files(vec![FileDownloadInfo::new("a.xlsx", "http://localhost/a", 10)]);

        let (reporter, mut receiver) = ProgressReporter::channel();
        reporter.report(&task, Some(0));

        let progress = receiver.try_recv().unwrap();
        assert_eq!(progress.task_id, task.task_id);
        assert_eq!(progress.total_file_count, 1);
        assert_eq!(progress.current_file.unwrap().file_name, "a.xlsx");
    }

    #[test]
    fn test_disabled_reporter_does_not_panic() {
        let task = FileDownloadTask::new("t", FileDownloadTaskType::MockExam, 1);
        let reporter = ProgressReporter::disabled();
        assert!(reporter.is_closed());
        reporter.report(&task, None);
    }
}
