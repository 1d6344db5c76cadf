//! Cluster accessor abstraction
//!
//! Everything that reads or writes cluster objects goes through
//! [`ClusterAccessor`]:
//! - [`KubeAccessor`]: the live API server through kube-rs
//! - [`MockCluster`]: in-memory cluster for tests

mod live;
mod mock;

pub use live::KubeAccessor;
pub use mock::{MockCluster, Operation, OperationCounts};

use async_trait::async_trait;
use certkeeper_core::{ManagedResource, ObjectKey};
use std::collections::BTreeMap;

use crate::error::Result;

/// Read/write access to cluster objects
///
/// A missing object is reported as an error for which
/// [`KubeError::is_not_found`](crate::KubeError::is_not_found) is true.
#[async_trait]
pub trait ClusterAccessor: Send + Sync {
    /// Read the live object
    async fn get(&self, key: &ObjectKey) -> Result<ManagedResource>;

    /// Create an object that does not exist yet
    async fn create(&self, obj: &ManagedResource) -> Result<ManagedResource>;

    /// Replace an existing object, guarded by its resourceVersion when set
    async fn update(&self, obj: &ManagedResource) -> Result<ManagedResource>;

    /// Delete an object with background propagation
    async fn delete(&self, key: &ObjectKey) -> Result<()>;

    /// List every deletable object matching all `selector` labels, in the
    /// given namespaces plus cluster-scoped objects
    async fn list(
        &self,
        selector: &BTreeMap<String, String>,
        namespaces: &[&str],
    ) -> Result<Vec<ManagedResource>>;
}

/// Render a label selector as `k1=v1,k2=v2`
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
