//! Local file manifest source

use async_trait::async_trait;
use certkeeper_core::ManifestSource;
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};
use crate::location::resolve_path;

/// Manifest source backed by a path template on the local filesystem
pub struct FileManifestSource {
    template: PathBuf,
    display: String,
}

impl FileManifestSource {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        let template = template.into();
        let display = template.display().to_string();
        Self { template, display }
    }

    /// Path a version resolves to
    pub fn path_for(&self, version: &str) -> PathBuf {
        resolve_path(&self.template, version)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tracing::debug!(path = %path.display(), "Reading manifest");
        match tokio::fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RepoError::NotFound {
                path: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    fn location(&self) -> &str {
        &self.display
    }

    async fn fetch(&self, version: &str) -> certkeeper_core::Result<Vec<u8>> {
        let path = self.path_for(version);
        self.read(&path)
            .await
            .map_err(|e| e.into_core(&path.display().to_string()))
    }
}
