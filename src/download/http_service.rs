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


//! HTTP implementation of [`FileDownloadService`]
//!
//! Talks to the Examina web API:
//! - `GET api/fileupload/exam/{id}/files` for mock and online exams
//! - `GET api/fileupload/comprehensive-training/{id}/files`
//! - `GET api/fileupload/specialized-training/{id}/files`
//!
//! Each listing is an `ApiResponse` envelope holding file descriptors in
//! camelCase. Files are then streamed one at a time into
//! `<download_root>/<TypeFolder>/<id>/`, written to a `.part` file first and
//! renamed once complete. Archives are unpacked next to the download.
//!
//! # Task Flow
//! 1. Mark the task running and check free disk space (`disk_space_factor` ×
//!    total size, so archives have room to unpack)
//! 2. For each file in order: check cancellation, download, validate, extract
//! 3. The first failing file fails the whole task

use crate::config::DownloadConfig;
use crate::download::progress::{ProgressReporter, ProgressThrottle};
use crate::download::service::FileDownloadService;
use crate::download::task::{
    FileDownloadInfo, FileDownloadStatus, FileDownloadTask, FileDownloadTaskType,
};
use crate::error::{ExaminaError, Result};
use crate::file::archive::{extract_archive, extraction_directory, is_compressed_file};
use crate::file::manager::FileManager;
use crate::file::paths::{self, file_name_from_url, sanitize_filename, unique_file_name};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Suffix of in-progress downloads
const PARTIAL_SUFFIX: &str = ".part";

/// Write buffer for downloads
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Response envelope used by the Examina API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

/// File descriptor returned by the file listing endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFile {
    pub file_id: i64,
    #[serde(default)]
    pub original_file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub download_count: i64,
    pub download_url: String,
    /// Optional MD5 or SHA-256 hex digest
    #[serde(default, alias = "md5", alias = "sha256")]
    pub file_hash: Option<String>,
}

/// [`FileDownloadService`] backed by reqwest
pub struct HttpFileDownloadService {
    client: Client,
    config: DownloadConfig,
    /// Base URL with a trailing slash so relative joins keep its path
    base_url: Url,
    file_manager: FileManager,
}

impl HttpFileDownloadService {
    /// Build a service from validated configuration
    pub fn new(config: DownloadConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ExaminaError::InvalidConfiguration("access_token contains invalid characters".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let file_manager = FileManager::new(config.download_root.clone());

        Ok(Self {
            client,
            config,
            base_url,
            file_manager,
        })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Listing endpoint for exam files
    fn exam_files_endpoint(related_id: i64, task_type: FileDownloadTaskType) -> Result<String> {
        match task_type {
            FileDownloadTaskType::MockExam | FileDownloadTaskType::OnlineExam => {
                Ok(format!("api/fileupload/exam/{}/files", related_id))
            }
            other => Err(ExaminaError::enumeration_failed(
                format!("{} is not an exam type", other),
                None,
            )),
        }
    }

    /// Listing endpoint for training files. Anything that is not a
    /// specialized training lists through the comprehensive training endpoint.
    fn training_files_endpoint(related_id: i64, task_type: FileDownloadTaskType) -> String {
        match task_type {
            FileDownloadTaskType::SpecializedTraining => {
                format!("api/fileupload/specialized-training/{}/files", related_id)
            }
            _ => format!("api/fileupload/comprehensive-training/{}/files", related_id),
        }
    }

    /// Resolve a possibly relative download URL against the base URL
    fn resolve_url(&self, raw: &str) -> Result<Url> {
        if raw.trim().is_empty() {
            return Err(ExaminaError::InvalidDownloadUrl("empty download URL".to_string()));
        }
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(self.base_url.join(raw)?),
            Err(e) => Err(ExaminaError::InvalidDownloadUrl(format!("{}: {}", raw, e))),
        }
    }

    async fn fetch_file_list(&self, endpoint: &str) -> Result<Vec<FileDownloadInfo>> {
        let url = self.base_url.join(endpoint)?;
        debug!(url = %url, "Fetching file list");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "File list request failed");
            return Err(ExaminaError::UnexpectedStatusCode {
                status_code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let envelope: ApiResponse<Vec<ServerFile>> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(ExaminaError::enumeration_failed(
                envelope
                    .message
                    .unwrap_or_else(|| "server reported failure".to_string()),
                Some(url.to_string()),
            ));
        }

        let files = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|dto| self.to_download_info(dto))
            .collect::<Result<Vec<_>>>()?;

        info!(url = %url, count = files.len(), "Fetched file list");
        Ok(files)
    }

    fn to_download_info(&self, dto: ServerFile) -> Result<FileDownloadInfo> {
        let url = self.resolve_url(&dto.download_url)?;
        let file_name = if dto.original_file_name.trim().is_empty() {
            file_name_from_url(url.as_str()).unwrap_or_else(|| format!("file-{}", dto.file_id))
        } else {
            dto.original_file_name
        };

        let mut info = FileDownloadInfo::new(file_name, url.to_string(), dto.file_size);
        info.file_id = Some(dto.file_id);
        info.is_compressed = is_compressed_file(&info.file_name);
        info.content_type = dto.content_type;
        info.expected_hash = dto.file_hash.filter(|h| !h.trim().is_empty());
        Ok(info)
    }

    /// Remove everything downloaded for an exam or training
    pub async fn cleanup_downloaded_files(
        &self,
        task_type: FileDownloadTaskType,
        related_id: i64,
    ) -> Result<()> {
        let dir = self.download_directory(task_type, related_id);
        info!(dir = %dir.display(), "Removing downloaded files");
        self.file_manager.remove_directory(&dir).await
    }

    /// Fetch one file into its local path
    async fn download_file(
        &self,
        task: &mut FileDownloadTask,
        index: usize,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (url, path, expected_hash) = {
            let file = task
                .file(index)
                .ok_or_else(|| ExaminaError::internal(format!("file index {} out of range", index)))?;
            let path = file.local_file_path.clone().ok_or_else(|| {
                ExaminaError::internal(format!("no local path assigned for {}", file.file_name))
            })?;
            (file.download_url().to_string(), path, file.expected_hash.clone())
        };

        task.update_file(index, |f| {
            f.downloaded_size = 0;
            f.download_speed = 0.0;
            f.set_status(FileDownloadStatus::Downloading, "Downloading...");
        });
        progress.report(task, Some(index));
        debug!(url = %url, path = %path.display(), "Downloading file");

        if let Some(parent) = path.parent() {
            self.file_manager.ensure_directory_exists(parent).await?;
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExaminaError::Cancelled),
            response = self.client.get(&url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ExaminaError::UnexpectedStatusCode {
                status_code: status.as_u16(),
                url,
            });
        }
        if let Some(length) = response.content_length() {
            task.update_file(index, |f| f.total_size = length);
        }

        let part_path = partial_path(&path);
        let downloaded = match self
            .stream_to_file(response, &part_path, task, index, progress, cancel)
            .await
        {
            Ok(downloaded) => downloaded,
            Err(e) => {
                if let Err(cleanup) = self.file_manager.safe_delete(&part_path).await {
                    warn!(path = %part_path.display(), error = %cleanup, "Could not remove partial download");
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, &path).await?;

        if let Err(e) = FileManager::verify_file_integrity(&path, expected_hash.as_deref()).await {
            let _ = self.file_manager.safe_delete(&path).await;
            return Err(e);
        }

        task.update_file(index, |f| {
            f.downloaded_size = downloaded;
            if f.total_size == 0 {
                f.total_size = downloaded;
            }
            f.set_status(FileDownloadStatus::Downloaded, "Download finished");
        });
        progress.report(task, Some(index));
        info!(file = %path.display(), bytes = downloaded, "File downloaded");
        Ok(())
    }

    /// Stream a response body to disk, reporting throttled progress
    async fn stream_to_file(
        &self,
        response: Response,
        part_path: &Path,
        task: &mut FileDownloadTask,
        index: usize,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let file = File::create(part_path).await?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut throttle = ProgressThrottle::new(self.config.progress_interval());
        let mut downloaded: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExaminaError::Cancelled),
                next = stream.next() => next,
            };

            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };

            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if throttle.update(downloaded) {
                let speed = throttle.average_speed();
                task.update_file(index, |f| {
                    f.downloaded_size = downloaded;
                    f.download_speed = speed;
                });
                progress.report(task, Some(index));
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(downloaded)
    }

    /// Unpack a downloaded archive into its extract path
    async fn extract_file(
        &self,
        task: &mut FileDownloadTask,
        index: usize,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (archive, destination) = {
            let file = task
                .file(index)
                .ok_or_else(|| ExaminaError::internal(format!("file index {} out of range", index)))?;
            match (&file.local_file_path, &file.extract_path) {
                (Some(archive), Some(destination)) => (archive.clone(), destination.clone()),
                _ => {
                    return Err(ExaminaError::internal(format!(
                        "no extract path assigned for {}",
                        file.file_name
                    )))
                }
            }
        };

        task.update_file(index, |f| f.set_status(FileDownloadStatus::Extracting, "Extracting..."));
        progress.report(task, Some(index));

        let entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExaminaError::Cancelled),
            result = extract_archive(&archive, &destination) => result?,
        };

        task.update_file(index, |f| f.set_status(FileDownloadStatus::Completed, "Extracted"));
        progress.report(task, Some(index));
        info!(archive = %archive.display(), entries, "Archive extracted");
        Ok(())
    }

    fn fail_task(task: &mut FileDownloadTask, index: usize, message: String, cause: &ExaminaError) {
        error!(task = %task.task_name, error = %cause, "{}", message);
        task.update_file(index, |f| f.mark_failed(cause.user_message()));
        task.mark_failed(message);
    }
}

#[async_trait]
impl FileDownloadService for HttpFileDownloadService {
    async fn get_exam_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>> {
        let endpoint = Self::exam_files_endpoint(related_id, task_type)?;
        self.fetch_file_list(&endpoint).await
    }

    async fn get_training_files(
        &self,
        related_id: i64,
        task_type: FileDownloadTaskType,
    ) -> Result<Vec<FileDownloadInfo>> {
        let endpoint = Self::training_files_endpoint(related_id, task_type);
        self.fetch_file_list(&endpoint).await
    }

    fn create_download_task(
        &self,
        task_name: &str,
        task_type: FileDownloadTaskType,
        related_id: i64,
        files: Vec<FileDownloadInfo>,
    ) -> FileDownloadTask {
        let dir = self.download_directory(task_type, related_id);
        let mut used = HashSet::new();

        let files = files
            .into_iter()
            .map(|mut file| {
                let local_name = unique_file_name(&mut used, &sanitize_filename(&file.file_name));
                if file.is_compressed {
                    file.extract_path = Some(extraction_directory(&dir, &local_name));
                }
                file.local_file_path = Some(dir.join(local_name));
                file
            })
            .collect();

        let mut task = FileDownloadTask::new(task_name, task_type, related_id).with_files(files);
        task.status_message = "Preparing download...".to_string();
        task
    }

    async fn start_download_task(
        &self,
        task: &mut FileDownloadTask,
        progress: &ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<bool> {
        task.mark_running();
        progress.report(task, None);
        info!(task = %task.task_name, files = task.total_file_count(), "Starting download task");

        let dir = self.download_directory(task.task_type, task.related_id);
        if self.config.check_disk_space {
            let required = task.total_size().saturating_mul(self.config.disk_space_factor);
            if let Err(e) = self.file_manager.check_disk_space(&dir, required) {
                warn!(task = %task.task_name, error = %e, "Not enough disk space");
                task.mark_failed(e.user_message());
                progress.report(task, None);
                return Ok(false);
            }
        }
        if let Err(e) = self.file_manager.ensure_directory_exists(&dir).await {
            task.mark_failed(e.user_message());
            progress.report(task, None);
            return Ok(false);
        }

        for index in 0..task.total_file_count() {
            if cancel.is_cancelled() {
                self.cancel_download_task(task);
                progress.report(task, Some(index));
                return Err(ExaminaError::Cancelled);
            }

            let (status, is_compressed, name) = match task.file(index) {
                Some(file) => (file.status, file.is_compressed, file.file_name.clone()),
                None => break,
            };
            if status == FileDownloadStatus::Completed {
                continue;
            }

            if !status.is_transferred() {
                match self.download_file(task, index, progress, &cancel).await {
                    Ok(()) => {}
                    Err(e) if e.is_cancellation() => {
                        self.cancel_download_task(task);
                        progress.report(task, Some(index));
                        return Err(ExaminaError::Cancelled);
                    }
                    Err(e) => {
                        Self::fail_task(task, index, format!("File download failed: {}", name), &e);
                        progress.report(task, Some(index));
                        return Ok(false);
                    }
                }
            }

            if is_compressed {
                match self.extract_file(task, index, progress, &cancel).await {
                    Ok(()) => {}
                    Err(e) if e.is_cancellation() => {
                        self.cancel_download_task(task);
                        progress.report(task, Some(index));
                        return Err(ExaminaError::Cancelled);
                    }
                    Err(e) => {
                        Self::fail_task(task, index, format!("File extraction failed: {}", name), &e);
                        progress.report(task, Some(index));
                        return Ok(false);
                    }
                }
            } else {
                task.update_file(index, |f| f.set_status(FileDownloadStatus::Completed, "Ready"));
                progress.report(task, Some(index));
            }
        }

        task.mark_completed();
        task.status_message = "Download completed".to_string();
        progress.report(task, None);
        info!(task = %task.task_name, "Download task completed");
        Ok(true)
    }

    fn cancel_download_task(&self, task: &mut FileDownloadTask) {
        info!(task = %task.task_name, "Cancelling download task");
        task.mark_cancelled();
    }

    async fn cleanup_temp_files(&self, task: &FileDownloadTask) -> Result<()> {
        for file in task.files() {
            let Some(local) = &file.local_file_path else {
                continue;
            };

            let _ = self.file_manager.safe_delete(&partial_path(local)).await;

            let extracted = file.is_compressed
                && file.status == FileDownloadStatus::Completed
                && file.extract_path.as_deref().map(Path::exists).unwrap_or(false);
            if extracted {
                match self.file_manager.safe_delete(local).await {
                    Ok(()) => debug!(file = %local.display(), "Removed extracted archive"),
                    Err(e) => warn!(file = %local.display(), error = %e, "Could not remove archive"),
                }
            }
        }
        Ok(())
    }

    fn download_directory(&self, task_type: FileDownloadTaskType, related_id: i64) -> PathBuf {
        paths::download_directory(&self.config.download_root, task_type, related_id)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
