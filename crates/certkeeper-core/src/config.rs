//! Configuration for the cert-manager lifecycle
//!
//! Stored in `~/.config/certkeeper/config.yaml`:
//!
//! ```yaml
//! cert-manager:
//!   url: https://github.com/cert-manager/cert-manager/releases/latest/cert-manager.yaml
//!   version: v1.16.3
//!   timeout: 10m
//! images:
//!   all:
//!     repository: registry.example.com/mirror
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::images::ImageOverrides;

/// Where the cert-manager manifest is published
pub const DEFAULT_CERT_MANAGER_URL: &str =
    "https://github.com/cert-manager/cert-manager/releases/latest/cert-manager.yaml";

/// Version installed when none is configured
pub const DEFAULT_CERT_MANAGER_VERSION: &str = "v1.16.3";

/// How long to wait for the cert-manager API to come up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "cert-manager")]
    pub cert_manager: CertManagerConfig,

    #[serde(default)]
    pub images: ImageOverrides,
}

/// Desired cert-manager release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertManagerConfig {
    /// Manifest location, see `certkeeper-repo` for the supported forms
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Readiness timeout as a duration string ("10m", "1h30m", "90s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

fn default_url() -> String {
    DEFAULT_CERT_MANAGER_URL.to_string()
}

fn default_version() -> String {
    DEFAULT_CERT_MANAGER_VERSION.to_string()
}

fn default_timeout() -> String {
    humantime::format_duration(DEFAULT_TIMEOUT).to_string()
}

impl Default for CertManagerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            version: default_version(),
            timeout: default_timeout(),
        }
    }
}

impl CertManagerConfig {
    /// Parsed readiness timeout; an empty or unparsable value falls back to the default
    pub fn wait_timeout(&self) -> Duration {
        match humantime::parse_duration(self.timeout.trim()) {
            Ok(timeout) => timeout,
            Err(e) => {
                tracing::warn!(
                    timeout = %self.timeout,
                    error = %e,
                    "Invalid value set for cert-manager timeout, using default"
                );
                DEFAULT_TIMEOUT
            }
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::InvalidConfig {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(config)
    }

    /// An explicit path must exist; otherwise fall back to [`Config::load`]
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("certkeeper").join("config.yaml"))
    }
}
