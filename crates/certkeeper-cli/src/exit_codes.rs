//! Exit codes of the certkeeper binary

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - unreadable config file, kubeconfig or manifest location
pub const CONFIG_ERROR: i32 = 2;

/// Manifest error - fetch, decode or image rewrite failed
pub const MANIFEST_ERROR: i32 = 3;

/// Cluster error - a Kubernetes API call failed
pub const CLUSTER_ERROR: i32 = 4;

/// cert-manager did not become ready in time
pub const TIMEOUT: i32 = 5;

/// Interrupted by the user
pub const CANCELLED: i32 = 6;
