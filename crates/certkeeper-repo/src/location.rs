//! Manifest locations and per-version resolution
//!
//! A location is configured once and resolved for every requested version:
//!
//! - `https://github.com/o/r/releases/latest/cert-manager.yaml` resolves to
//!   `https://github.com/o/r/releases/download/<version>/cert-manager.yaml`
//! - any URL or path containing `{version}` has the placeholder substituted
//! - a local path with a `latest` directory has that directory replaced
//! - anything else is used as-is

use std::path::{Component, Path, PathBuf};

use crate::error::{RepoError, Result};

/// Placeholder substituted with the requested version
pub const VERSION_PLACEHOLDER: &str = "{version}";

const GITHUB_LATEST: &str = "/releases/latest/";
const LATEST_DIR: &str = "latest";

/// Where manifests are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocation {
    /// HTTP(S) URL template
    Http(String),
    /// Local file path template
    File(PathBuf),
}

impl ManifestLocation {
    /// Detect the location type from a configured string
    pub fn detect(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RepoError::InvalidUrl {
                url: raw.to_string(),
                reason: "empty location".to_string(),
            });
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            // Braces are not valid URL characters, validate with a concrete version
            url::Url::parse(&raw.replace(VERSION_PLACEHOLDER, "v0.0.0")).map_err(|e| {
                RepoError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(Self::Http(raw.to_string()));
        }

        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }

        if raw.contains("://") {
            return Err(RepoError::InvalidUrl {
                url: raw.to_string(),
                reason: "unsupported scheme, expected http(s):// or file://".to_string(),
            });
        }

        Ok(Self::File(PathBuf::from(raw)))
    }
}

/// Resolve an HTTP URL template for a version
pub fn resolve_url(template: &str, version: &str) -> String {
    if template.contains(VERSION_PLACEHOLDER) {
        template.replace(VERSION_PLACEHOLDER, version)
    } else if template.contains(GITHUB_LATEST) {
        template.replacen(GITHUB_LATEST, &format!("/releases/download/{}/", version), 1)
    } else {
        template.to_string()
    }
}

/// Resolve a file path template for a version
pub fn resolve_path(template: &Path, version: &str) -> PathBuf {
    let as_str = template.to_string_lossy();
    if as_str.contains(VERSION_PLACEHOLDER) {
        return PathBuf::from(as_str.replace(VERSION_PLACEHOLDER, version));
    }

    template
        .components()
        .map(|c| match c {
            Component::Normal(part) if part == LATEST_DIR => Component::Normal(version.as_ref()),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert!(matches!(
            ManifestLocation::detect("https://github.com/cert-manager/cert-manager/releases/latest/cert-manager.yaml"),
            Ok(ManifestLocation::Http(_))
        ));
        assert!(matches!(
            ManifestLocation::detect("https://mirror.local/cert-manager/{version}/cert-manager.yaml"),
            Ok(ManifestLocation::Http(_))
        ));
        assert_eq!(
            ManifestLocation::detect("file:///opt/manifests/latest/cert-manager.yaml").unwrap(),
            ManifestLocation::File(PathBuf::from("/opt/manifests/latest/cert-manager.yaml"))
        );
        assert_eq!(
            ManifestLocation::detect("./cert-manager.yaml").unwrap(),
            ManifestLocation::File(PathBuf::from("./cert-manager.yaml"))
        );
    }

    #[test]
    fn test_detect_rejects_invalid() {
        assert!(ManifestLocation::detect("  ").is_err());
        assert!(ManifestLocation::detect("oci://registry/cert-manager").is_err());
        assert!(ManifestLocation::detect("https://").is_err());
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(
                "https://github.com/cert-manager/cert-manager/releases/latest/cert-manager.yaml",
                "v1.16.3"
            ),
            "https://github.com/cert-manager/cert-manager/releases/download/v1.16.3/cert-manager.yaml"
        );
        assert_eq!(
            resolve_url("https://mirror.local/{version}/cm.yaml", "v1.16.3"),
            "https://mirror.local/v1.16.3/cm.yaml"
        );
        assert_eq!(
            resolve_url("https://mirror.local/pinned/cm.yaml", "v1.16.3"),
            "https://mirror.local/pinned/cm.yaml"
        );
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path(Path::new("/opt/cert-manager/latest/cert-manager.yaml"), "v1.16.3"),
            PathBuf::from("/opt/cert-manager/v1.16.3/cert-manager.yaml")
        );
        assert_eq!(
            resolve_path(Path::new("/opt/{version}.yaml"), "v1.16.3"),
            PathBuf::from("/opt/v1.16.3.yaml")
        );
        assert_eq!(
            resolve_path(Path::new("manifests/cert-manager.yaml"), "v1.16.3"),
            PathBuf::from("manifests/cert-manager.yaml")
        );
    }
}
