//! certkeeper Core - data model shared by the cert-manager lifecycle crates
//!
//! This crate provides:
//! - `ManagedResource`: an untyped Kubernetes object with typed metadata accessors
//! - `VersionTag`: lenient semantic versions compared including build metadata
//! - Manifest decoding and the `ManifestSource` contract
//! - Provenance labels and version annotations
//! - Image overrides and configuration

pub mod components;
pub mod config;
pub mod error;
pub mod images;
pub mod labels;
pub mod manifest;
pub mod resource;
pub mod version;

pub use components::prepare_components;
pub use config::{CertManagerConfig, Config};
pub use error::{CoreError, Result};
pub use images::{ImageOverride, ImageOverrides, inspect_images, rewrite_images};
pub use manifest::{ManifestSource, StaticManifestSource, decode_manifest};
pub use resource::{GroupVersionKind, ManagedResource, ObjectKey, ObjectMeta};
pub use version::{VersionOrdering, VersionTag};
