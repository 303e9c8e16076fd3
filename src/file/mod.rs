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


//! File management and path utilities
//!
//! This module handles the on-disk side of preparation: where files go,
//! how archives are unpacked, and how downloads are cleaned up again.

pub mod archive;
pub mod manager;
pub mod paths;

// Re-export commonly used types
pub use archive::{extract_archive, is_compressed_file, ArchiveFormat};
pub use manager::FileManager;
pub use paths::{download_directory, sanitize_filename};
