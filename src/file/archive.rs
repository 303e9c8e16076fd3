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


//! Archive detection and extraction
//!
//! # Supported Formats
//! - `.zip`
//! - `.7z`
//! - `.tar`, `.tar.gz` / `.tgz`, `.tar.bz2` / `.tbz2`, `.tar.xz` / `.txz`
//! - `.gz`, `.bz2`, `.xz` (single compressed file)
//!
//! `.rar` is not treated as an archive: such files are downloaded and kept
//! as they are.
//!
//! Extraction is blocking I/O and runs on tokio's blocking pool.

use crate::error::{ExaminaError, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use sevenz_rust::{Password, SevenZReader};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Known archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Gzip,
    Bzip2,
    Xz,
}

/// Suffixes in match order; compound suffixes come before their tails
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tar.xz", ArchiveFormat::TarXz),
    (".txz", ArchiveFormat::TarXz),
    (".zip", ArchiveFormat::Zip),
    (".7z", ArchiveFormat::SevenZip),
    (".tar", ArchiveFormat::Tar),
    (".gz", ArchiveFormat::Gzip),
    (".bz2", ArchiveFormat::Bzip2),
    (".xz", ArchiveFormat::Xz),
];

impl ArchiveFormat {
    /// Detect the format from a file name (case-insensitive)
    pub fn detect(file_name: &str) -> Option<Self> {
        split_suffix(file_name).map(|(format, _)| format)
    }
}

/// Format and suffix length of an archive file name
fn split_suffix(file_name: &str) -> Option<(ArchiveFormat, usize)> {
    let name = file_name.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(suffix, format)| (*format, suffix.len()))
}

/// Whether the file name looks like an archive
pub fn is_compressed_file(file_name: &str) -> bool {
    ArchiveFormat::detect(file_name).is_some()
}

/// Extract an archive into `destination`, creating it if needed.
///
/// Returns the number of files written.
pub async fn extract_archive(archive_path: &Path, destination: &Path) -> Result<usize> {
    let archive_path = archive_path.to_path_buf();
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive_path, &destination))
        .await?
}

fn extract_archive_blocking(archive_path: &Path, destination: &Path) -> Result<usize> {
    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ExaminaError::ExtractionFailed(format!("Invalid archive file name: {:?}", archive_path)))?;

    let (format, suffix_len) = split_suffix(file_name)
        .ok_or_else(|| ExaminaError::UnsupportedArchive(file_name.to_string()))?;

    info!(archive = %archive_path.display(), destination = %destination.display(), "Extracting archive");
    std::fs::create_dir_all(destination)?;

    let inner_name = &file_name[..file_name.len() - suffix_len];
    let entries = match format {
        ArchiveFormat::Zip => extract_zip(archive_path, destination)?,
        ArchiveFormat::SevenZip => extract_7z(archive_path, file_name, destination)?,
        ArchiveFormat::Tar => unpack_tar(Archive::new(File::open(archive_path)?), destination)?,
        ArchiveFormat::TarGz => {
            unpack_tar(Archive::new(GzDecoder::new(File::open(archive_path)?)), destination)?
        }
        ArchiveFormat::TarBz2 => {
            unpack_tar(Archive::new(BzDecoder::new(File::open(archive_path)?)), destination)?
        }
        ArchiveFormat::TarXz => {
            unpack_tar(Archive::new(XzDecoder::new(File::open(archive_path)?)), destination)?
        }
        ArchiveFormat::Gzip => {
            let decoder = GzDecoder::new(File::open(archive_path)?);
            extract_single(decoder, file_name, inner_name, destination)?
        }
        ArchiveFormat::Bzip2 => {
            let decoder = BzDecoder::new(File::open(archive_path)?);
            extract_single(decoder, file_name, inner_name, destination)?
        }
        ArchiveFormat::Xz => {
            let decoder = XzDecoder::new(File::open(archive_path)?);
            extract_single(decoder, file_name, inner_name, destination)?
        }
    };

    debug!(archive = %archive_path.display(), entries, "Extraction completed");
    Ok(entries)
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        // Entries escaping the destination are skipped
        let outpath = match entry.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
        written += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(written)
}

fn extract_7z(archive_path: &Path, file_name: &str, destination: &Path) -> Result<usize> {
    let failed = |e: sevenz_rust::Error| ExaminaError::ExtractionFailed(format!("{}: {}", file_name, e));

    let mut archive = SevenZReader::open(archive_path, Password::empty()).map_err(failed)?;
    let mut written = 0;
    let mut write_error = None;

    archive
        .for_each_entries(|entry, reader| {
            match write_7z_entry(entry.name(), entry.is_directory(), reader, destination) {
                Ok(files) => {
                    written += files;
                    Ok(true)
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(false)
                }
            }
        })
        .map_err(failed)?;

    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(written),
    }
}

fn write_7z_entry(
    name: &str,
    is_directory: bool,
    reader: &mut dyn Read,
    destination: &Path,
) -> std::io::Result<usize> {
    // Entries escaping the destination are skipped
    let Some(relative) = enclosed_path(name) else {
        std::io::copy(reader, &mut std::io::sink())?;
        return Ok(0);
    };
    let outpath = destination.join(relative);

    if is_directory {
        std::fs::create_dir_all(&outpath)?;
        return Ok(0);
    }
    if let Some(parent) = outpath.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut outfile = File::create(&outpath)?;
    std::io::copy(reader, &mut outfile)?;
    Ok(1)
}

/// Relative path of an archive entry, `None` if it would leave the destination
fn enclosed_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut enclosed = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => enclosed.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!enclosed.as_os_str().is_empty()).then_some(enclosed)
}

fn unpack_tar<R: Read>(mut archive: Archive<R>, destination: &Path) -> Result<usize> {
    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        // unpack_in refuses paths outside the destination
        if entry.unpack_in(destination)? && entry.header().entry_type().is_file() {
            written += 1;
        }
    }
    Ok(written)
}

/// Decompress a single-file stream (`.gz`, `.bz2`, `.xz`) into `destination`
fn extract_single<R: Read>(
    mut decoder: R,
    file_name: &str,
    inner_name: &str,
    destination: &Path,
) -> Result<usize> {
    let inner_name = if inner_name.is_empty() { "content" } else { inner_name };

    let mut outfile = File::create(destination.join(inner_name))?;
    std::io::copy(&mut decoder, &mut outfile)
        .map_err(|e| ExaminaError::ExtractionFailed(format!("{}: {}", file_name, e)))?;
    Ok(1)
}

/// Folder an archive is unpacked into: its name without the archive suffix
pub fn extraction_directory(download_dir: &Path, file_name: &str) -> PathBuf {
    let stem = match split_suffix(file_name) {
        Some((_, suffix_len)) => &file_name[..file_name.len() - suffix_len],
        None => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name),
    };
    let stem = if stem.trim().is_empty() { "extracted" } else { stem };
    download_dir.join(stem)
}
