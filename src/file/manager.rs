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


//! File operations and management
//!
//! # Key Operations
//! - Safe deletes with retry (files may still be held open by a viewer)
//! - Directory creation and removal
//! - Free disk space lookup
//! - Integrity checks against a published MD5 or SHA-256 digest

use crate::error::{ExaminaError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::Disks;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Maximum retry attempts for file operations
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Read buffer for hashing
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// File manager for safe file operations below a download root
#[derive(Debug, Clone)]
pub struct FileManager {
    download_root: PathBuf,
}

impl FileManager {
    pub fn new(download_root: PathBuf) -> Self {
        Self { download_root }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Safe delete operation with retry
    pub async fn safe_delete(&self, path: &Path) -> Result<()> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match Self::safe_delete_once(path).await {
                Ok(()) => return Ok(()),
                Err(e) if attempts >= MAX_RETRY_ATTEMPTS => {
                    return Err(ExaminaError::IoError(std::io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to delete file after {} attempts: {}: {}",
                            MAX_RETRY_ATTEMPTS,
                            path.display(),
                            e
                        ),
                    )));
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Delete failed, retrying");
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Try to delete file once. A missing file is not an error.
    async fn safe_delete_once(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Remove a directory tree below the download root.
    ///
    /// Paths outside the root are refused.
    pub async fn remove_directory(&self, path: &Path) -> Result<()> {
        if !path.starts_with(&self.download_root) {
            return Err(ExaminaError::invalid_state(format!(
                "Refusing to remove {} outside of {}",
                path.display(),
                self.download_root.display()
            )));
        }

        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ensure directory exists, creating parent directories as needed
    pub async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            ExaminaError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {}", path.display(), e),
            ))
        })
    }

    /// Free space on the disk holding `path`, `None` if it cannot be determined
    pub fn available_disk_space(path: &Path) -> Option<u64> {
        let target = nearest_existing_path(path);
        let target = std::fs::canonicalize(&target).unwrap_or(target);
        let disks = Disks::new_with_refreshed_list();

        // Longest matching mount point wins
        let mut best: Option<(usize, u64)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if target.starts_with(mount) {
                let score = mount.as_os_str().len();
                match best {
                    Some((best_score, _)) if best_score >= score => {}
                    _ => best = Some((score, disk.available_space())),
                }
            }
        }

        best.map(|(_, available)| available)
    }

    /// Fail with `InsufficientDiskSpace` if less than `required_bytes` is free.
    /// Unknown free space is treated as sufficient.
    pub fn check_disk_space(&self, path: &Path, required_bytes: u64) -> Result<()> {
        match Self::available_disk_space(path) {
            Some(have) if have < required_bytes => Err(ExaminaError::InsufficientDiskSpace {
                need: required_bytes,
                have,
            }),
            Some(_) => Ok(()),
            None => {
                warn!(path = %path.display(), "Could not determine free disk space, continuing");
                Ok(())
            }
        }
    }

    /// Validate a downloaded file
    ///
    /// Without a digest the file only has to exist and be readable. A 32 hex
    /// digit digest is compared as MD5, a 64 digit one as SHA-256, ignoring case.
    pub async fn verify_file_integrity(path: &Path, expected_hash: Option<&str>) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let expected = match expected_hash.map(str::trim).filter(|h| !h.is_empty()) {
            Some(expected) => expected,
            None => {
                // Readability check
                let mut file = fs::File::open(path).await?;
                let mut first_byte = [0u8; 1];
                file.read(&mut first_byte).await?;
                return Ok(());
            }
        };

        let actual = match expected.len() {
            32 => md5_hex(path).await?,
            64 => sha256_hex(path).await?,
            _ => {
                return Err(ExaminaError::IntegrityCheckFailed {
                    file_name,
                    expected: expected.to_string(),
                    actual: "unsupported digest length".to_string(),
                })
            }
        };

        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(ExaminaError::IntegrityCheckFailed {
                file_name,
                expected: expected.to_string(),
                actual,
            })
        }
    }
}

fn nearest_existing_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while !candidate.exists() {
        if !candidate.pop() {
            return PathBuf::from(".");
        }
    }
    candidate
}

async fn md5_hex(path: &Path) -> Result<String> {
    let mut context = md5::Context::new();
    read_chunks(path, |chunk| context.consume(chunk)).await?;
    Ok(format!("{:x}", context.compute()))
}

async fn sha256_hex(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    read_chunks(path, |chunk| hasher.update(chunk)).await?;
    Ok(hex::encode(hasher.finalize()))
}

async fn read_chunks(path: &Path, mut consume: impl FnMut(&[u8])) -> Result<()> {
    let mut file = fs::File::open(path).await?;
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        consume(&buffer[..read]);
    }
}
