//! Error types for certkeeper-kube

use certkeeper_core::{CoreError, ObjectKey};
use thiserror::Error;

/// Result type for certkeeper-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while managing cert-manager in a cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Object does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Object already exists or was modified concurrently
    #[error("conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    /// The API server does not serve this kind (yet)
    #[error("no matches for kind '{kind}' in version '{api_version}'")]
    UnknownKind { api_version: String, kind: String },

    /// A cluster call failed for a specific object
    #[error("failed to {action} {resource}: {source}")]
    Cluster {
        action: &'static str,
        resource: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Version string that is not a semantic version
    #[error("invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    /// Manifest could not be fetched, decoded or rewritten
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Timeout
    #[error("operation timed out after {0}")]
    Timeout(String),

    /// CRD storage version migration failed
    #[error("failed to migrate CRD '{crd}': {message}")]
    Migration { crd: String, message: String },

    /// Cancellation requested by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidVersion { value, source } => KubeError::InvalidVersion {
                value,
                reason: source.to_string(),
            },
            CoreError::InvalidConfig { message } => KubeError::InvalidConfig(message),
            CoreError::JsonParse(e) => KubeError::Serialization(e.to_string()),
            other => KubeError::Manifest(other.to_string()),
        }
    }
}

impl KubeError {
    /// Attach the failed action and the object's identity
    pub fn wrap(self, action: &'static str, key: &ObjectKey) -> Self {
        KubeError::Cluster {
            action,
            resource: key.to_string(),
            source: Box::new(self),
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            KubeError::NotFound { .. } => true,
            KubeError::Cluster { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 409,
            KubeError::Conflict { .. } => true,
            KubeError::Cluster { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// Check if the caller cancelled the operation
    pub fn is_cancelled(&self) -> bool {
        match self {
            KubeError::Cancelled => true,
            KubeError::Cluster { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ObjectKey {
        ObjectKey {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            namespace: Some("cert-manager".to_string()),
            name: "cert-manager".to_string(),
        }
    }

    #[test]
    fn test_wrap_keeps_classification() {
        let err = KubeError::NotFound {
            resource: key().to_string(),
        }
        .wrap("get", &key());
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert_eq!(
            err.to_string(),
            "failed to get Deployment cert-manager/cert-manager (apps/v1): \
             Deployment cert-manager/cert-manager (apps/v1) not found"
        );

        let err = KubeError::Cancelled.wrap("create", &key());
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_from_core_error() {
        let err: KubeError = CoreError::InvalidConfig {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, KubeError::InvalidConfig(_)));

        let err: KubeError = CoreError::Fetch {
            location: "https://example.com".to_string(),
            message: "HTTP 404".to_string(),
        }
        .into();
        assert!(matches!(err, KubeError::Manifest(_)));

        let err: KubeError = certkeeper_core::VersionTag::parse_tolerant("banana")
            .unwrap_err()
            .into();
        assert!(matches!(err, KubeError::InvalidVersion { .. }));
    }
}
