//! Preparation flow against a scripted download service
//!
//! Each call to `start_download_task` pops the next [`Step`] and plays it out,
//! reporting progress the way the HTTP service does.

use async_trait::async_trait;
use examina_core::download::{FileDownloadStatus, ProgressReporter};
use examina_core::preparation::{
    has_files_to_download, prepare_files_for_online_exam, FileDownloadPreparationViewModel,
    PreparationPhase, PreparationSnapshot,
};
use examina_core::{
    ExaminaError, FileDownloadInfo, FileDownloadService, FileDownloadTask, FileDownloadTaskType,
    Result,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Download every pending file
    Succeed,
    /// Download files before the index, then fail that one
    FailAt(usize),
    /// Start the first file and wait for cancellation
    WaitForCancel,
    /// Return an error without touching the task
    Error,
}

struct ScriptedService {
    /// `None` makes listing fail
    listing: Mutex<Option<Vec<FileDownloadInfo>>>,
    steps: Mutex<VecDeque<Step>>,
    downloads: AtomicUsize,
    cancels: AtomicUsize,
    cleanups: AtomicUsize,
}

impl ScriptedService {
    fn with_files(count: usize, steps: &[Step]) -> Arc<Self> {
        let files = (0..count)
            .map(|i| FileDownloadInfo::new(format!("section-{}.pdf", i + 1), format!("/files/{}", i + 1), 1000))
            .collect();
        Arc::new(Self {
            listing: Mutex::new(Some(files)),
            steps: Mutex::new(steps.iter().copied().collect()),
            downloads: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        })
    }

    fn failing_listing() -> Arc<Self> {
        let service = Self::with_files(0, &[]);
        *service.listing.lock().unwrap() = None;
        service
    }

    fn set_listing(&self, count: usize) {
        let files = (0..count)
            .map(|i| FileDownloadInfo::new(format!("late-{}.zip", i), format!("/files/late/{}", i), 500))
            .collect();
        *self.listing.lock().unwrap() = Some(files);
    }

    async fn complete_file(task: &mut FileDownloadTask, index: usize, progress: &ProgressReporter) {
        task.update_file(index, |f| {
            f.set_status(FileDownloadStatus::Downloading, "Downloading");
            f.downloaded_size = f.total_size / 2;
        });
        progress.report(task, Some(index));
        tokio::task::yield_now().await;

        task.update_file(index, |f| {
            f.downloaded_size = f.total_size;
            f.set_status(FileDownloadStatus::Completed, "Ready");
        });
        progress.report(task, Some(index));
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl FileDownloadService for ScriptedService {
    async fn get_exam_files(
        &self,
        _related_id: i64,
        _task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>> {
        let listing = self.listing.lock().unwrap().clone();
        listing.ok_or_else(|| ExaminaError::enumeration_failed("exam not found", None))
    }

    async fn get_training_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>> {
        self.get_exam_files(related_id, task_type).await
    }

    fn create_download_task(
        &self,
        task_name: &str,
        task_type: FileDownloadTaskType,
        related_id: i64,
        files: Vec<FileDownloadInfo>,
    ) -> FileDownloadTask {
        FileDownloadTask::new(task_name, task_type, related_id).with_files(files)
    }

    async fn start_download_task(
        &self,
        task: &mut FileDownloadTask,
        progress: &ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<bool> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Succeed);
        task.mark_running();
        progress.report(task, None);

        match step {
            Step::Succeed => {
                while let Some(index) = task.next_pending_index() {
                    Self::complete_file(task, index, progress).await;
                }
                task.mark_completed();
                progress.report(task, None);
                Ok(true)
            }
            Step::FailAt(failed) => {
                for index in 0..failed {
                    if task.file(index).map(|f| f.status) == Some(FileDownloadStatus::Pending) {
                        Self::complete_file(task, index, progress).await;
                    }
                }
                let name = task.file(failed).map(|f| f.file_name.clone()).unwrap_or_default();
                task.update_file(failed, |f| f.mark_failed("connection reset"));
                task.mark_failed(format!("File download failed: {}", name));
                progress.report(task, Some(failed));
                Ok(false)
            }
            Step::WaitForCancel => {
                task.update_file(0, |f| {
                    f.set_status(FileDownloadStatus::Downloading, "Downloading");
                    f.downloaded_size = 100;
                });
                progress.report(task, Some(0));
                cancel.cancelled().await;
                Err(ExaminaError::Cancelled)
            }
            Step::Error => Err(ExaminaError::download_failed("socket closed")),
        }
    }

    fn cancel_download_task(&self, task: &mut FileDownloadTask) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        task.mark_cancelled();
    }

    async fn cleanup_temp_files(&self, _task: &FileDownloadTask) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn download_directory(&self, task_type: FileDownloadTaskType, related_id: i64) -> PathBuf {
        PathBuf::from("/tmp/examina-tests")
            .join(task_type.folder_name())
            .join(related_id.to_string())
    }
}

fn is_terminal(snapshot: &PreparationSnapshot) -> bool {
    matches!(
        snapshot.phase,
        PreparationPhase::Completed | PreparationPhase::Cancelled | PreparationPhase::Error
    )
}

/// Collect every snapshot the watch channel delivers until a terminal phase
fn record(vm: &FileDownloadPreparationViewModel) -> JoinHandle<Vec<PreparationSnapshot>> {
    let mut snapshots = vm.subscribe();
    tokio::spawn(async move {
        let mut seen = vec![snapshots.borrow_and_update().clone()];
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let done = is_terminal(&snapshot);
            seen.push(snapshot);
            if done {
                break;
            }
        }
        seen
    })
}

async fn wait_until_downloading(vm: &FileDownloadPreparationViewModel) {
    let mut snapshots = vm.subscribe();
    tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.is_downloading))
        .await
        .expect("download never started")
        .expect("view model dropped");
}

fn assert_flags_consistent(snapshot: &PreparationSnapshot) {
    assert_eq!(snapshot.can_cancel_download, snapshot.is_downloading, "{:?}", snapshot);
    assert_eq!(snapshot.can_close, !snapshot.is_downloading, "{:?}", snapshot);
    assert_eq!(
        snapshot.can_retry_download,
        snapshot.has_error && !snapshot.is_downloading,
        "{:?}",
        snapshot
    );
    assert!(
        snapshot.completed_file_count + snapshot.failed_file_count <= snapshot.total_file_count,
        "{:?}",
        snapshot
    );
}

#[tokio::test]
async fn test_zero_files_completes_without_download() {
    let service = ScriptedService::with_files(0, &[]);
    let vm = FileDownloadPreparationViewModel::new(service.clone());

    vm.initialize("Mock exam: Empty", FileDownloadTaskType::MockExam, 1)
        .await
        .unwrap();

    let snapshot = vm.snapshot();
    assert!(snapshot.is_completed);
    assert!(!snapshot.can_start_download);
    assert!(!snapshot.has_error);
    assert_eq!(snapshot.overall_progress, 100.0);
    assert_eq!(snapshot.status_message, "No files need to be downloaded");
    assert!(vm.task().is_none());

    assert!(matches!(
        vm.start_download().await,
        Err(ExaminaError::CommandUnavailable(_))
    ));
    assert_eq!(service.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_successful_download_counts_every_file() {
    let service = ScriptedService::with_files(3, &[Step::Succeed]);
    let vm = FileDownloadPreparationViewModel::new(service.clone());

    vm.initialize("Online exam: Networks", FileDownloadTaskType::OnlineExam, 12)
        .await
        .unwrap();
    assert!(vm.can_start_download());

    let recorder = record(&vm);
    vm.start_download().await.unwrap();
    let seen = recorder.await.unwrap();

    let snapshot = vm.snapshot();
    assert!(snapshot.is_completed);
    assert!(!snapshot.has_error);
    assert_eq!(snapshot.total_file_count, 3);
    assert_eq!(snapshot.completed_file_count, 3);
    assert_eq!(snapshot.failed_file_count, 0);
    assert_eq!(snapshot.overall_progress, 100.0);
    assert_eq!(snapshot.status_message, "Download completed");
    assert!(!snapshot.can_start_download);
    assert_eq!(service.cleanups.load(Ordering::SeqCst), 1);

    assert!(seen.iter().any(|s| s.is_downloading));
    for snapshot in &seen {
        assert_flags_consistent(snapshot);
    }

    let during: Vec<f64> = seen
        .iter()
        .filter(|s| s.is_downloading)
        .map(|s| s.overall_progress)
        .collect();
    assert!(
        during.windows(2).all(|pair| pair[0] <= pair[1]),
        "progress went backwards: {:?}",
        during
    );
}

#[tokio::test]
async fn test_cancel_is_not_an_error() {
    let service = ScriptedService::with_files(2, &[Step::WaitForCancel]);
    let vm = Arc::new(FileDownloadPreparationViewModel::new(service.clone()));

    vm.initialize("Specialized training: Firewalls", FileDownloadTaskType::SpecializedTraining, 5)
        .await
        .unwrap();
    assert!(!vm.can_cancel_download());

    let runner = {
        let vm = vm.clone();
        tokio::spawn(async move { vm.start_download().await })
    };
    wait_until_downloading(&vm).await;

    assert!(vm.can_cancel_download());
    assert!(!vm.can_close());
    assert!(!vm.can_start_download());
    vm.cancel_download().unwrap();

    runner.await.unwrap().unwrap();

    let snapshot = vm.snapshot();
    assert_eq!(snapshot.phase, PreparationPhase::Cancelled);
    assert_eq!(snapshot.status_message, "Download cancelled");
    assert!(!snapshot.has_error);
    assert!(snapshot.error_message.is_none());
    assert!(!snapshot.can_cancel_download);
    assert!(!snapshot.can_retry_download);
    assert!(snapshot.can_close);
    assert!(snapshot.can_start_download);
    assert_eq!(service.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(service.cleanups.load(Ordering::SeqCst), 0);

    let task = vm.task().unwrap();
    assert!(task
        .files()
        .iter()
        .all(|f| f.status == FileDownloadStatus::Cancelled));

    assert!(matches!(
        vm.retry_download().await,
        Err(ExaminaError::CommandUnavailable(_))
    ));
}

#[tokio::test]
async fn test_failed_download_sets_error_from_task() {
    let service = ScriptedService::with_files(3, &[Step::FailAt(1)]);
    let vm = FileDownloadPreparationViewModel::new(service.clone());

    vm.initialize("Mock exam: Databases", FileDownloadTaskType::MockExam, 8)
        .await
        .unwrap();
    vm.start_download().await.unwrap();

    let snapshot = vm.snapshot();
    assert_eq!(snapshot.phase, PreparationPhase::Error);
    assert!(snapshot.has_error);
    assert!(!snapshot.is_completed);
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("File download failed: section-2.pdf")
    );
    assert_eq!(snapshot.status_message, "Download failed");
    assert_eq!(snapshot.completed_file_count, 1);
    assert_eq!(snapshot.failed_file_count, 1);
    assert!(snapshot.can_retry_download);
    assert!(snapshot.can_close);
    assert_flags_consistent(&snapshot);
}

#[tokio::test]
async fn test_service_error_is_captured() {
    let service = ScriptedService::with_files(1, &[Step::Error]);
    let vm = FileDownloadPreparationViewModel::new(service);

    vm.initialize("Comprehensive training: Linux", FileDownloadTaskType::ComprehensiveTraining, 2)
        .await
        .unwrap();
    vm.start_download().await.unwrap();

    assert!(vm.has_error());
    assert_eq!(
        vm.error_message().as_deref(),
        Some("Download failed: socket closed")
    );
}

#[tokio::test]
async fn test_retry_clears_error_before_downloading() {
    let service = ScriptedService::with_files(2, &[Step::FailAt(0), Step::WaitForCancel, Step::Succeed]);
    let vm = Arc::new(FileDownloadPreparationViewModel::new(service.clone()));

    vm.initialize("Online exam: Security", FileDownloadTaskType::OnlineExam, 21)
        .await
        .unwrap();
    vm.start_download().await.unwrap();
    assert!(vm.has_error());

    // Retry is held on the second step until cancelled
    let runner = {
        let vm = vm.clone();
        tokio::spawn(async move { vm.retry_download().await })
    };
    wait_until_downloading(&vm).await;

    let snapshot = vm.snapshot();
    assert!(!snapshot.has_error);
    assert!(snapshot.error_message.is_none());
    assert!(!snapshot.can_retry_download);
    assert!(matches!(
        vm.retry_download().await,
        Err(ExaminaError::CommandUnavailable(_))
    ));

    vm.cancel_download().unwrap();
    runner.await.unwrap().unwrap();
    assert_eq!(vm.phase(), PreparationPhase::Cancelled);

    // A cancelled session can start again and finish
    vm.start_download().await.unwrap();
    let snapshot = vm.snapshot();
    assert!(snapshot.is_completed);
    assert_eq!(snapshot.completed_file_count, 2);
    assert_eq!(snapshot.failed_file_count, 0);
    assert_eq!(service.downloads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_listing_failure_then_retry() {
    let service = ScriptedService::failing_listing();
    let vm = FileDownloadPreparationViewModel::new(service.clone());

    vm.initialize("Mock exam: Offline", FileDownloadTaskType::MockExam, 3)
        .await
        .unwrap();

    let snapshot = vm.snapshot();
    assert!(snapshot.has_error);
    assert_eq!(snapshot.status_message, "Failed to load the file list");
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("Failed to get file list: exam not found")
    );
    assert!(!snapshot.can_start_download);
    assert!(snapshot.can_retry_download);
    assert!(snapshot.can_close);

    service.set_listing(2);
    vm.retry_download().await.unwrap();

    let snapshot = vm.snapshot();
    assert_eq!(snapshot.phase, PreparationPhase::Ready);
    assert!(!snapshot.has_error);
    assert_eq!(snapshot.total_file_count, 2);
    assert!(snapshot.can_start_download);
}

#[tokio::test]
async fn test_close_outside_download_only_signals() {
    let service = ScriptedService::with_files(1, &[]);
    let vm = FileDownloadPreparationViewModel::new(service.clone());

    vm.initialize("Mock exam: Close", FileDownloadTaskType::MockExam, 4)
        .await
        .unwrap();
    assert!(vm.can_close());

    vm.close();
    tokio::time::timeout(Duration::from_secs(1), vm.closed())
        .await
        .unwrap();

    let snapshot = vm.snapshot();
    assert!(snapshot.close_requested);
    assert_eq!(snapshot.phase, PreparationPhase::Ready);
    assert_eq!(service.cancels.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_initialize_rejected_while_downloading() {
    let service = ScriptedService::with_files(1, &[Step::WaitForCancel]);
    let vm = Arc::new(FileDownloadPreparationViewModel::new(service));

    vm.initialize("Online exam: Busy", FileDownloadTaskType::OnlineExam, 6)
        .await
        .unwrap();
    let runner = {
        let vm = vm.clone();
        tokio::spawn(async move { vm.start_download().await })
    };
    wait_until_downloading(&vm).await;

    let again = vm
        .initialize("Online exam: Busy", FileDownloadTaskType::OnlineExam, 6)
        .await;
    assert!(matches!(again, Err(ExaminaError::InvalidState(_))));

    vm.cancel_download().unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_prepare_helpers() {
    let service = ScriptedService::with_files(2, &[Step::Succeed]);

    assert!(has_files_to_download(service.as_ref(), FileDownloadTaskType::OnlineExam, 30).await);

    let snapshot = prepare_files_for_online_exam(service.clone(), 30, "Final")
        .await
        .unwrap();
    assert_eq!(snapshot.task_name, "Online exam: Final");
    assert!(snapshot.is_completed);
    assert_eq!(snapshot.completed_file_count, 2);

    let failing = ScriptedService::failing_listing();
    assert!(!has_files_to_download(failing.as_ref(), FileDownloadTaskType::MockExam, 30).await);
}
