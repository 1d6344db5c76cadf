//! Manifest decoding and the manifest source contract

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::resource::ManagedResource;

/// Resolves a version of the add-on into its raw multi-document manifest
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Where manifests are read from, for logs and errors
    fn location(&self) -> &str;

    /// Fetch the raw manifest for `version`
    async fn fetch(&self, version: &str) -> Result<Vec<u8>>;
}

/// Decode a multi-document YAML manifest into objects
///
/// Empty and comment-only documents are skipped and `kind: List` documents are
/// flattened into their items.
pub fn decode_manifest(data: &[u8]) -> Result<Vec<ManagedResource>> {
    let text = std::str::from_utf8(data).map_err(|e| CoreError::InvalidManifest {
        message: format!("manifest is not valid UTF-8: {}", e),
    })?;

    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|e| CoreError::InvalidManifest {
            message: format!("document {}: {}", index, e),
        })?;

        match value {
            Value::Null => continue,
            Value::Object(ref map) if map.is_empty() => continue,
            Value::Object(_) => {}
            _ => {
                return Err(CoreError::InvalidManifest {
                    message: format!("document {} is not a mapping", index),
                });
            }
        }

        if value.get("kind").and_then(Value::as_str) == Some("List") {
            let items = value
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for item in items {
                objects.push(decode_object(item, index)?);
            }
        } else {
            objects.push(decode_object(value, index)?);
        }
    }

    Ok(objects)
}

fn decode_object(value: Value, index: usize) -> Result<ManagedResource> {
    ManagedResource::from_value(value).map_err(|e| CoreError::InvalidManifest {
        message: format!("document {}: {}", index, e),
    })
}

/// In-memory manifest source keyed by version
#[derive(Debug, Clone, Default)]
pub struct StaticManifestSource {
    location: String,
    manifests: HashMap<String, Vec<u8>>,
}

impl StaticManifestSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            manifests: HashMap::new(),
        }
    }

    /// Register the manifest served for `version`
    pub fn with_manifest(mut self, version: impl Into<String>, manifest: impl Into<Vec<u8>>) -> Self {
        self.manifests.insert(version.into(), manifest.into());
        self
    }
}

#[async_trait]
impl ManifestSource for StaticManifestSource {
    fn location(&self) -> &str {
        &self.location
    }

    async fn fetch(&self, version: &str) -> Result<Vec<u8>> {
        self.manifests
            .get(version)
            .cloned()
            .ok_or_else(|| CoreError::Fetch {
                location: self.location.clone(),
                message: format!("no manifest for version {}", version),
            })
    }
}
