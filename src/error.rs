//! Error types for the Examina client core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the stage of the preparation flow they come from so that
//! the view model can decide what to surface to the student.
//!
//! ## Error Stages
//!
//! ### Enumeration (file list lookup)
//! - Server rejected the request → `EnumerationFailed`, `UnexpectedStatusCode`
//! - Malformed response body → `SerdeJsonError` (via `#[from]`)
//!
//! ### Transfer
//! - Network failures → `ReqwestError` (via `#[from]`), `DownloadFailed`
//! - Bad or relative-only URLs → `InvalidDownloadUrl`, `UrlParseError`
//! - Not enough room on disk → `InsufficientDiskSpace`
//!
//! ### Post-processing
//! - Archive could not be unpacked → `ExtractionFailed`, `ZipError`
//! - Archive format we cannot unpack → `UnsupportedArchive`
//! - Hash mismatch → `IntegrityCheckFailed`
//!
//! ### Orchestration
//! - User-initiated stop → `Cancelled` (never treated as a failure)
//! - Command issued while unavailable → `CommandUnavailable`
//! - Illegal state transition → `InvalidState`

use thiserror::Error;

/// Result type alias using our ExaminaError type
pub type Result<T> = std::result::Result<T, ExaminaError>;

/// Main error type for the Examina client core
#[derive(Error, Debug)]
pub enum ExaminaError {
    // ===== Enumeration Errors =====

    /// The server could not produce a file list for the exam or training
    #[error("Failed to get file list: {message}")]
    EnumerationFailed {
        message: String,
        /// Endpoint that was queried
        endpoint: Option<String>,
    },

    /// Server returned unexpected status code
    #[error("Server responded with unexpected status code: {status_code}")]
    UnexpectedStatusCode {
        status_code: u16,
        url: String,
    },

    // ===== Download Errors =====

    /// Generic download failure
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Invalid download URL format or protocol
    #[error("Invalid download URL: {0}")]
    InvalidDownloadUrl(String),

    /// Insufficient disk space for operation
    #[error("Insufficient disk space (need {need} bytes, have {have} bytes)")]
    InsufficientDiskSpace {
        need: u64,
        have: u64,
    },

    /// Downloaded file does not match the hash published by the server
    #[error("Integrity check failed for {file_name}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        file_name: String,
        expected: String,
        actual: String,
    },

    // ===== Archive Errors =====

    /// Archive extraction failed
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Archive format is recognised but cannot be unpacked
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    // ===== Orchestration Errors =====

    /// Operation was cancelled by user or system
    #[error("Operation cancelled")]
    Cancelled,

    /// A command was issued while its availability flag was false
    #[error("Command not available: {0}")]
    CommandUnavailable(&'static str),

    /// Application state is invalid for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Zip archive error
    #[error("Zip archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl From<tokio::task::JoinError> for ExaminaError {
    fn from(err: tokio::task::JoinError) -> Self {
        ExaminaError::InternalError(format!("Background task failed: {}", err))
    }
}

// Helper methods for creating common errors
impl ExaminaError {
    /// Create an EnumerationFailed error
    pub fn enumeration_failed<S: Into<String>>(message: S, endpoint: Option<String>) -> Self {
        ExaminaError::EnumerationFailed {
            message: message.into(),
            endpoint,
        }
    }

    /// Create a DownloadFailed error with a message
    pub fn download_failed<S: Into<String>>(message: S) -> Self {
        ExaminaError::DownloadFailed(message.into())
    }

    /// Create an InvalidState error with a message
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        ExaminaError::InvalidState(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ExaminaError::InternalError(message.into())
    }

    /// Check if the error represents a user-initiated cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExaminaError::Cancelled)
    }

    /// Check if error is retryable (network errors, 5xx responses, etc.)
    ///
    /// Returns `true` for transient errors that might succeed on retry.
    /// Disk space, integrity and configuration problems need manual action first.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExaminaError::ReqwestError(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            ExaminaError::UnexpectedStatusCode { status_code, .. } => {
                (500..=599).contains(status_code) || *status_code == 429
            }
            ExaminaError::DownloadFailed(_)
            | ExaminaError::EnumerationFailed { .. }
            | ExaminaError::IoError(_) => true,
            _ => false,
        }
    }

    /// Check if error is related to file/disk operations
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            ExaminaError::IoError(_)
                | ExaminaError::InsufficientDiskSpace { .. }
                | ExaminaError::ExtractionFailed(_)
                | ExaminaError::UnsupportedArchive(_)
                | ExaminaError::ZipError(_)
                | ExaminaError::IntegrityCheckFailed { .. }
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            ExaminaError::InsufficientDiskSpace { need, have } => {
                format!(
                    "Insufficient disk space. Need {} MB, but only {} MB available.",
                    need / 1_000_000,
                    have / 1_000_000
                )
            }
            ExaminaError::ReqwestError(e) if e.is_timeout() => {
                "The server did not respond in time. Please check your connection and try again.".to_string()
            }
            ExaminaError::ReqwestError(e) if e.is_connect() => {
                "Could not connect to the server. Please check your connection and try again.".to_string()
            }
            ExaminaError::UnexpectedStatusCode { status_code: 401 | 403, .. } => {
                "You are not allowed to download these files. Please sign in again.".to_string()
            }
            ExaminaError::IntegrityCheckFailed { file_name, .. } => {
                format!("'{}' was damaged during download. Please try again.", file_name)
            }
            ExaminaError::UnsupportedArchive(name) => {
                format!("'{}' is packed in a format that cannot be unpacked on this device.", name)
            }
            ExaminaError::Cancelled => "Download cancelled".to_string(),
            _ => self.to_string(),
        }
    }
}
