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


//! Download path layout and filename sanitization
//!
//! # Layout
//! ```text
//! <download_root>/<TypeFolder>/<related_id>/<file_name>
//! <download_root>/<TypeFolder>/<related_id>/<archive stem>/...   (extracted)
//! ```
//! Type folders: `MockExams`, `OnlineExams`, `ComprehensiveTraining`,
//! `SpecializedTraining`.

use crate::download::task::FileDownloadTaskType;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MAX_COMPONENT_LENGTH: usize = 255;

lazy_static! {
    /// Characters that are invalid in file names on at least one platform
    static ref INVALID_FILENAME_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#)
        .expect("invalid filename pattern");

    /// Runs of whitespace collapse to one space
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("invalid whitespace pattern");
}

/// Directory holding the files of one exam or training
pub fn download_directory(
    download_root: &Path,
    task_type: FileDownloadTaskType,
    related_id: i64,
) -> PathBuf {
    download_root
        .join(task_type.folder_name())
        .join(related_id.to_string())
}

/// Sanitize a server-provided file name for the local filesystem
///
/// Path separators are replaced too, so the result never leaves its directory.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(name, "_");
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");

    // Trim leading/trailing whitespace and dots
    let mut result = collapsed.trim().trim_matches('.').trim().to_string();

    if cfg!(target_os = "windows") {
        result = handle_windows_reserved_names(&result);
    }

    if result.is_empty() {
        result = "file".to_string();
    }

    truncate_preserving_extension(&result, MAX_COMPONENT_LENGTH)
}

/// Handle Windows reserved filenames
fn handle_windows_reserved_names(name: &str) -> String {
    let upper = name.to_uppercase();
    let reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
        "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    for reserved_name in &reserved {
        if upper == *reserved_name || upper.starts_with(&format!("{}.", reserved_name)) {
            return format!("_{}", name);
        }
    }

    name.to_string()
}

/// Truncate text to fit within a byte limit on a UTF-8 boundary
pub fn truncate_component(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut index = max_bytes;
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    text[..index].to_string()
}

/// Truncate a file name, keeping its extension intact
fn truncate_preserving_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(dot) if name.len() - dot < max_bytes / 2 => {
            let (stem, ext) = name.split_at(dot);
            format!("{}{}", truncate_component(stem, max_bytes - ext.len()), ext)
        }
        _ => truncate_component(name, max_bytes),
    }
}

/// Make `name` unique among `used` by appending (1), (2), etc.
///
/// The chosen name is inserted into `used`.
pub fn unique_file_name(used: &mut HashSet<String>, name: &str) -> String {
    if used.insert(name.to_ascii_lowercase()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    let mut counter = 1;
    loop {
        let candidate = if extension.is_empty() {
            format!("{} ({})", stem, counter)
        } else {
            format!("{} ({}).{}", stem, counter, extension)
        };

        if used.insert(candidate.to_ascii_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Last path segment of a URL, used when the listing omits a file name
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    Some(decoded.into_owned())
}
