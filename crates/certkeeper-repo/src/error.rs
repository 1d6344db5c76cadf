//! Error types for manifest sources

use certkeeper_core::CoreError;
use thiserror::Error;

/// Manifest source errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Invalid manifest URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    // ============ Network Errors ============
    #[error("HTTP error fetching {url}: {status}")]
    HttpError { url: String, status: u16 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ File Errors ============
    #[error("Manifest not found: {path}")]
    NotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for manifest source operations
pub type Result<T> = std::result::Result<T, RepoError>;

/// Request timeout used by the HTTP source
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: REQUEST_TIMEOUT_SECS,
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

impl RepoError {
    /// Convert into the core error reported by the manifest source contract
    pub fn into_core(self, location: &str) -> CoreError {
        CoreError::Fetch {
            location: location.to_string(),
            message: self.to_string(),
        }
    }
}
