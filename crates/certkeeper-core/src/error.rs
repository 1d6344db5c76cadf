//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid version '{value}': {source}")]
    InvalidVersion {
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("failed to parse manifest: {message}")]
    InvalidManifest { message: String },

    #[error("invalid image reference '{image}': {reason}")]
    InvalidImage { image: String, reason: String },

    #[error("failed to fetch manifest from {location}: {message}")]
    Fetch { location: String, message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
