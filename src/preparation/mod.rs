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


//! Preparation of exam and training files
//!
//! [`FileDownloadPreparationViewModel`] drives one session from file listing to
//! finished download. The `prepare_files*` helpers run a whole session
//! without a host UI.

pub mod state;
pub mod view_model;

pub use state::{CommandAvailability, PreparationEvent, PreparationPhase};
pub use view_model::{FileDownloadPreparationViewModel, PreparationSnapshot};

use crate::download::service::FileDownloadService;
use crate::download::task::FileDownloadTaskType;
use crate::error::Result;
use std::sync::Arc;
use tracing::warn;

/// Task name shown for an exam or training, e.g. "Mock exam: Algebra I"
pub fn task_name_for(task_type: FileDownloadTaskType, name: &str) -> String {
    format!("{}: {}", task_type.display_name(), name)
}

/// List and download all files for one exam or training
///
/// Returns the final snapshot. A failed listing or download is reported in
/// the snapshot rather than as `Err`.
pub async fn prepare_files(
    service: Arc<dyn FileDownloadService>,
    task_name: &str,
    task_type: FileDownloadTaskType,
    related_id: i64,
) -> Result<PreparationSnapshot> {
    let view_model = FileDownloadPreparationViewModel::new(service);
    view_model.initialize(task_name, task_type, related_id).await?;
    if view_model.can_start_download() {
        view_model.start_download().await?;
    }
    Ok(view_model.snapshot())
}

pub async fn prepare_files_for_mock_exam(
    service: Arc<dyn FileDownloadService>,
    exam_id: i64,
    exam_name: &str,
) -> Result<PreparationSnapshot> {
    let task_type = FileDownloadTaskType::MockExam;
    prepare_files(service, &task_name_for(task_type, exam_name), task_type, exam_id).await
}

pub async fn prepare_files_for_online_exam(
    service: Arc<dyn FileDownloadService>,
    exam_id: i64,
    exam_name: &str,
) -> Result<PreparationSnapshot> {
    let task_type = FileDownloadTaskType::OnlineExam;
    prepare_files(service, &task_name_for(task_type, exam_name), task_type, exam_id).await
}

pub async fn prepare_files_for_comprehensive_training(
    service: Arc<dyn FileDownloadService>,
    training_id: i64,
    training_name: &str,
) -> Result<PreparationSnapshot> {
    let task_type = FileDownloadTaskType::ComprehensiveTraining;
    prepare_files(service, &task_name_for(task_type, training_name), task_type, training_id)
        .await
}

pub async fn prepare_files_for_specialized_training(
    service: Arc<dyn FileDownloadService>,
    training_id: i64,
    training_name: &str,
) -> Result<PreparationSnapshot> {
    let task_type = FileDownloadTaskType::SpecializedTraining;
    prepare_files(service, &task_name_for(task_type, training_name), task_type, training_id)
        .await
}

/// Whether the exam or training has any files attached.
/// Listing errors count as "no files".
pub async fn has_files_to_download(
    service: &dyn FileDownloadService,
    task_type: FileDownloadTaskType,
    related_id: i64,
) -> bool {
    match service.get_files(related_id, task_type).await {
        Ok(files) => !files.is_empty(),
        Err(e) => {
            warn!(%task_type, related_id, error = %e, "Could not check for files");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_name_for() {
        assert_eq!(
            task_name_for(FileDownloadTaskType::MockExam, "Algebra I"),
            "Mock exam: Algebra I"
        );
        assert_eq!(
            task_name_for(FileDownloadTaskType::SpecializedTraining, "Welding"),
            "Specialized training: Welding"
        );
    }
}
