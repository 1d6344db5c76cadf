//! Create-or-update of cluster objects

use std::sync::Arc;

use certkeeper_core::ManagedResource;

use crate::accessor::ClusterAccessor;
use crate::backoff::Retrier;
use crate::error::Result;
use crate::ordering::sort_for_install;

/// Idempotently writes objects to the cluster
#[derive(Clone)]
pub struct ResourceInstaller {
    cluster: Arc<dyn ClusterAccessor>,
    retrier: Retrier,
}

impl ResourceInstaller {
    pub fn new(cluster: Arc<dyn ClusterAccessor>, retrier: Retrier) -> Self {
        Self { cluster, retrier }
    }

    /// Create the object, or update it in place if it already exists
    ///
    /// The live resourceVersion is carried onto the update so a concurrent
    /// writer surfaces as a conflict instead of being overwritten.
    pub async fn apply(&self, obj: &ManagedResource) -> Result<()> {
        let key = obj.key();

        match self.cluster.get(&key).await {
            Ok(live) => {
                tracing::debug!(
                    kind = %key.kind,
                    namespace = key.namespace.as_deref().unwrap_or(""),
                    name = %key.name,
                    "Updating"
                );
                let mut desired = obj.clone();
                desired.set_resource_version(live.resource_version().map(str::to_string));
                self.cluster
                    .update(&desired)
                    .await
                    .map_err(|e| e.wrap("update", &key))?;
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    kind = %key.kind,
                    namespace = key.namespace.as_deref().unwrap_or(""),
                    name = %key.name,
                    "Creating"
                );
                self.cluster
                    .create(obj)
                    .await
                    .map_err(|e| e.wrap("create", &key))?;
            }
            Err(e) => return Err(e.wrap("get", &key)),
        }

        Ok(())
    }

    /// Apply every object in install order, retrying each with backoff
    ///
    /// Stops at the first object whose retries are exhausted. Objects applied
    /// before it are left in place.
    pub async fn install(&self, objects: &[ManagedResource]) -> Result<()> {
        for obj in sort_for_install(objects) {
            self.retrier.run(|| self.apply(obj)).await?;
        }
        Ok(())
    }
}
