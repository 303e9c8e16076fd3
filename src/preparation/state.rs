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


//! Preparation phases and command availability
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Idle, Ready, Completed, Cancelled, Error | BeginEnumeration | Enumerating |
//! | Enumerating | FilesFound | Ready |
//! | Enumerating | NoFiles | Completed |
//! | Enumerating | EnumerationFailed | Error |
//! | Ready, Cancelled, Error | DownloadStarted | Downloading |
//! | Downloading | DownloadSucceeded | Completed |
//! | Downloading | DownloadCancelled | Cancelled |
//! | Downloading | DownloadFailed | Error |
//! | Error | RetryRequested | Ready |
//!
//! Anything else is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a preparation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreparationPhase {
    Idle,
    Enumerating,
    Ready,
    Downloading,
    Completed,
    Cancelled,
    Error,
}

/// Input driving [`PreparationPhase`] transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreparationEvent {
    BeginEnumeration,
    FilesFound,
    NoFiles,
    EnumerationFailed,
    DownloadStarted,
    DownloadSucceeded,
    DownloadCancelled,
    DownloadFailed,
    RetryRequested,
}

impl PreparationPhase {
    /// Transition table. `None` means the event is not valid in this phase.
    pub fn on(self, event: PreparationEvent) -> Option<PreparationPhase> {
        use PreparationEvent as E;
        use PreparationPhase as P;

        match (self, event) {
            (P::Idle | P::Ready | P::Completed | P::Cancelled | P::Error, E::BeginEnumeration) => {
                Some(P::Enumerating)
            }
            (P::Enumerating, E::FilesFound) => Some(P::Ready),
            (P::Enumerating, E::NoFiles) => Some(P::Completed),
            (P::Enumerating, E::EnumerationFailed) => Some(P::Error),
            (P::Ready | P::Cancelled | P::Error, E::DownloadStarted) => Some(P::Downloading),
            (P::Downloading, E::DownloadSucceeded) => Some(P::Completed),
            (P::Downloading, E::DownloadCancelled) => Some(P::Cancelled),
            (P::Downloading, E::DownloadFailed) => Some(P::Error),
            (P::Error, E::RetryRequested) => Some(P::Ready),
            _ => None,
        }
    }

    pub fn is_downloading(&self) -> bool {
        *self == PreparationPhase::Downloading
    }

    pub fn is_completed(&self) -> bool {
        *self == PreparationPhase::Completed
    }

    pub fn has_error(&self) -> bool {
        *self == PreparationPhase::Error
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PreparationPhase::Enumerating | PreparationPhase::Downloading
        )
    }
}

impl fmt::Display for PreparationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreparationPhase::Idle => "idle",
            PreparationPhase::Enumerating => "enumerating",
            PreparationPhase::Ready => "ready",
            PreparationPhase::Downloading => "downloading",
            PreparationPhase::Completed => "completed",
            PreparationPhase::Cancelled => "cancelled",
            PreparationPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Which commands a host should enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandAvailability {
    pub can_start_download: bool,
    pub can_cancel_download: bool,
    pub can_retry_download: bool,
    pub can_close: bool,
}

impl CommandAvailability {
    /// Derive availability from flags
    pub fn derive(is_downloading: bool, is_completed: bool, has_error: bool, has_files: bool) -> Self {
        Self {
            can_start_download: !is_downloading && !is_completed && has_files,
            can_cancel_download: is_downloading,
            can_retry_download: has_error && !is_downloading,
            can_close: !is_downloading || is_completed || has_error,
        }
    }

    pub fn for_phase(phase: PreparationPhase, has_files: bool) -> Self {
        Self::derive(
            phase.is_downloading(),
            phase.is_completed(),
            phase.has_error(),
            has_files,
        )
    }
}
