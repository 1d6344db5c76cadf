//! Manifest source selection

use std::sync::Arc;

use certkeeper_core::ManifestSource;

use crate::error::Result;
use crate::file::FileManifestSource;
use crate::http::HttpManifestSource;
use crate::location::ManifestLocation;

/// Create the manifest source matching a configured location
pub fn create_source(location: &str) -> Result<Arc<dyn ManifestSource>> {
    let source: Arc<dyn ManifestSource> = match ManifestLocation::detect(location)? {
        ManifestLocation::Http(url) => Arc::new(HttpManifestSource::new(url)?),
        ManifestLocation::File(path) => Arc::new(FileManifestSource::new(path)),
    };
    tracing::debug!(location = source.location(), "Using manifest source");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepoError;

    #[test]
    fn test_create_source() {
        let http = create_source("https://example.com/releases/latest/cert-manager.yaml").unwrap();
        assert_eq!(
            http.location(),
            "https://example.com/releases/latest/cert-manager.yaml"
        );

        let file = create_source("file:///opt/cert-manager.yaml").unwrap();
        assert_eq!(file.location(), "/opt/cert-manager.yaml");
    }

    #[test]
    fn test_create_source_unsupported() {
        assert!(matches!(
            create_source("s3://bucket/cert-manager.yaml"),
            Err(RepoError::InvalidUrl { .. })
        ));
    }
}
