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


//! Client configuration
//!
//! Settings for talking to the Examina web API and laying files out on disk.
//! Values come from [`DownloadConfig::default`], an optional JSON file, and
//! finally `EXAMINA_*` environment variables, in that order.

use crate::error::{ExaminaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`DownloadConfig::base_url`]
pub const ENV_BASE_URL: &str = "EXAMINA_BASE_URL";
/// Environment variable overriding [`DownloadConfig::download_root`]
pub const ENV_DOWNLOAD_ROOT: &str = "EXAMINA_DOWNLOAD_ROOT";
/// Environment variable overriding [`DownloadConfig::access_token`]
pub const ENV_ACCESS_TOKEN: &str = "EXAMINA_ACCESS_TOKEN";

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Base URL of the Examina web API (e.g. `https://examina.example.org`)
    pub base_url: String,

    /// Root directory under which per-exam folders are created
    pub download_root: PathBuf,

    /// Bearer token attached to every request, if the session has one
    pub access_token: Option<String>,

    /// User-Agent header value
    pub user_agent: String,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds (0 disables it)
    pub request_timeout_secs: u64,

    /// Free space required, as a multiple of the total download size.
    /// Archives need room for both the archive and its contents.
    pub disk_space_factor: u64,

    /// Check free disk space before starting a task
    pub check_disk_space: bool,

    /// Minimum interval between byte-level progress reports
    pub progress_interval_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            download_root: default_download_root(),
            access_token: None,
            user_agent: format!("examina-client/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 10,
            request_timeout_secs: 0,
            disk_space_factor: 2,
            check_disk_space: true,
            progress_interval_ms: 200,
        }
    }
}

impl DownloadConfig {
    /// Load configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Apply `EXAMINA_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Ok(root) = std::env::var(ENV_DOWNLOAD_ROOT) {
            self.download_root = PathBuf::from(root);
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            if !token.is_empty() {
                self.access_token = Some(token);
            }
        }
        self
    }

    /// Validate settings before building a client
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ExaminaError::InvalidConfiguration(format!("base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExaminaError::InvalidConfiguration(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.download_root.as_os_str().is_empty() {
            return Err(ExaminaError::InvalidConfiguration(
                "download_root must not be empty".to_string(),
            ));
        }
        if self.disk_space_factor == 0 {
            return Err(ExaminaError::InvalidConfiguration(
                "disk_space_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Default download root: `<local data dir>/Examina/Downloads`, or
/// `./Examina/Downloads` when the platform has no data directory
pub fn default_download_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("Examina").join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("./Examina/Downloads"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = DownloadConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.disk_space_factor, 2);
        assert_eq!(config.progress_interval(), Duration::from_millis(200));
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = DownloadConfig {
            base_url: "ftp://example.org".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ExaminaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "base_url": "https://exam.example.org", "request_timeout_secs": 30 }"#,
        )
        .unwrap();

        let config = DownloadConfig::from_json_file(&path).unwrap();
        assert_eq!(config.base_url, "https://exam.example.org");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.disk_space_factor, 2);
        assert!(config.check_disk_space);
    }

    #[test]
    fn test_default_download_root() {
        let root = default_download_root();
        assert!(root.ends_with(Path::new("Examina").join("Downloads")));
        if let Some(data) = dirs::data_local_dir() {
            assert!(root.starts_with(data));
        }
    }
}
