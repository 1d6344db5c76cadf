//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`], which renders through miette
//! and decides the process exit code.

use certkeeper_core::CoreError;
use certkeeper_kube::KubeError;
use certkeeper_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration file, kubeconfig or manifest location is unusable
    #[error("Configuration error: {message}")]
    #[diagnostic(code(certkeeper::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// cert-manager manifest could not be fetched or decoded
    #[error("Manifest error: {message}")]
    #[diagnostic(code(certkeeper::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Kubernetes API failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(certkeeper::cli::cluster))]
    Cluster { message: String },

    /// cert-manager did not become ready in time
    #[error("Timed out: {message}")]
    #[diagnostic(
        code(certkeeper::cli::timeout),
        help("raise cert-manager.timeout in the configuration file or inspect the cert-manager pods")
    )]
    Timeout { message: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(certkeeper::cli::cancelled))]
    Cancelled,

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(certkeeper::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { message } => CliError::config(
                message,
                "see `certkeeper --help` for the configuration file location",
            ),
            CoreError::InvalidVersion { .. } => CliError::config(
                err.to_string(),
                "cert-manager.version must be a semantic version such as v1.16.3",
            ),
            CoreError::Io(e) => CliError::other(e.to_string()),
            other => CliError::Manifest {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidUrl { .. } => CliError::config(
                err.to_string(),
                "cert-manager.url must be an http(s):// URL, a file:// URL or a path",
            ),
            other => CliError::Manifest {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        if err.is_cancelled() {
            return CliError::Cancelled;
        }
        match err {
            KubeError::Timeout(after) => CliError::Timeout {
                message: format!("cert-manager was not ready after {}", after),
            },
            KubeError::InvalidConfig(message) => {
                CliError::config(message, "check --kubeconfig and --context")
            }
            KubeError::Manifest(message) => CliError::Manifest {
                message,
                help: Some("check cert-manager.url and cert-manager.version".to_string()),
            },
            KubeError::InvalidVersion { .. } => CliError::other(err.to_string()),
            other => CliError::Cluster {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use certkeeper_core::ObjectKey;

    #[test]
    fn test_exit_codes() {
        let cases = [
            (CliError::config("bad", "help"), exit_codes::CONFIG_ERROR),
            (
                CliError::Manifest {
                    message: "bad".into(),
                    help: None,
                },
                exit_codes::MANIFEST_ERROR,
            ),
            (CliError::Cluster { message: "bad".into() }, exit_codes::CLUSTER_ERROR),
            (CliError::Timeout { message: "10m".into() }, exit_codes::TIMEOUT),
            (CliError::Cancelled, exit_codes::CANCELLED),
            (CliError::other("bad"), exit_codes::ERROR),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{}", err);
        }
    }

    #[test]
    fn test_kube_error_mapping() {
        let key = ObjectKey {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
            namespace: None,
            name: "cert-manager".to_string(),
        };

        let wrapped_cancel = KubeError::Cancelled.wrap("create", &key);
        assert!(matches!(CliError::from(wrapped_cancel), CliError::Cancelled));

        let timeout = CliError::from(KubeError::Timeout("10m".to_string()));
        assert_eq!(timeout.exit_code(), exit_codes::TIMEOUT);
        assert!(timeout.to_string().contains("10m"));

        let conflict = KubeError::Conflict {
            resource: key.to_string(),
            message: "exists".to_string(),
        }
        .wrap("create", &key);
        assert_eq!(CliError::from(conflict).exit_code(), exit_codes::CLUSTER_ERROR);

        let kubeconfig = CliError::from(KubeError::InvalidConfig("kubeconfig: missing".to_string()));
        assert_eq!(kubeconfig.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_repo_and_core_error_mapping() {
        let invalid_url = RepoError::InvalidUrl {
            url: "ftp://x".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert_eq!(CliError::from(invalid_url).exit_code(), exit_codes::CONFIG_ERROR);

        let http = RepoError::HttpError {
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert_eq!(CliError::from(http).exit_code(), exit_codes::MANIFEST_ERROR);

        let fetch = CoreError::Fetch {
            location: "https://example.com".to_string(),
            message: "404".to_string(),
        };
        assert_eq!(CliError::from(fetch).exit_code(), exit_codes::MANIFEST_ERROR);
    }
}
