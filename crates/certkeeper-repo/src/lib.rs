//! certkeeper Repo - where cert-manager manifests come from
//!
//! This crate provides:
//! - HTTP(S) manifest sources (GitHub releases and mirrors)
//! - Local file manifest sources
//! - Per-version resolution of configured locations

pub mod backend;
pub mod error;
pub mod file;
pub mod http;
pub mod location;

pub use backend::create_source;
pub use error::{RepoError, Result};
pub use file::FileManifestSource;
pub use http::HttpManifestSource;
pub use location::{ManifestLocation, VERSION_PLACEHOLDER, resolve_path, resolve_url};
