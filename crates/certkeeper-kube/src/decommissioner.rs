//! Removal of cluster objects

use std::sync::Arc;

use certkeeper_core::{ManagedResource, ObjectKey};

use crate::accessor::ClusterAccessor;
use crate::backoff::Retrier;
use crate::error::Result;

/// Kinds left in place when an old release is decommissioned; the new
/// release updates them instead
pub const PROTECTED_KINDS: &[&str] = &[
    "CustomResourceDefinition",
    "Namespace",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Deletes objects from the cluster
#[derive(Clone)]
pub struct ResourceDecommissioner {
    cluster: Arc<dyn ClusterAccessor>,
    retrier: Retrier,
}

impl ResourceDecommissioner {
    pub fn new(cluster: Arc<dyn ClusterAccessor>, retrier: Retrier) -> Self {
        Self { cluster, retrier }
    }

    /// Delete one object; an object that is already gone counts as deleted
    pub async fn delete(&self, key: &ObjectKey) -> Result<()> {
        tracing::debug!(
            kind = %key.kind,
            namespace = key.namespace.as_deref().unwrap_or(""),
            name = %key.name,
            "Deleting"
        );
        match self.cluster.delete(key).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.wrap("delete", key)),
        }
    }

    /// Delete every object whose kind is not protected, retrying each
    pub async fn decommission(&self, objects: &[ManagedResource], protected: &[&str]) -> Result<()> {
        for obj in objects {
            if protected.contains(&obj.kind.as_str()) {
                continue;
            }
            let key = obj.key();
            self.retrier.run(|| self.delete(&key)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{MockCluster, Operation};
    use crate::clock::ManualClock;
    use tokio_util::sync::CancellationToken;

    fn decommissioner(cluster: &MockCluster) -> ResourceDecommissioner {
        let retrier = Retrier::new(Arc::new(ManualClock::new()), CancellationToken::new());
        ResourceDecommissioner::new(Arc::new(cluster.clone()), retrier)
    }

    #[tokio::test]
    async fn test_delete_absent_object_succeeds() {
        let cluster = MockCluster::new();
        let key = ManagedResource::new("v1", "Secret", "gone").in_namespace("cert-manager").key();

        decommissioner(&cluster).delete(&key).await.unwrap();
        assert_eq!(cluster.operation_counts().deletes, 1);
    }

    #[tokio::test]
    async fn test_decommission_never_deletes_protected_kinds() {
        let objects = vec![
            ManagedResource::new("v1", "Namespace", "cert-manager"),
            ManagedResource::new("apiextensions.k8s.io/v1", "CustomResourceDefinition", "issuers.cert-manager.io"),
            ManagedResource::new("apps/v1", "Deployment", "cert-manager").in_namespace("cert-manager"),
            ManagedResource::new("admissionregistration.k8s.io/v1", "MutatingWebhookConfiguration", "cert-manager-webhook"),
            ManagedResource::new("admissionregistration.k8s.io/v1", "ValidatingWebhookConfiguration", "cert-manager-webhook"),
            ManagedResource::new("v1", "Service", "cert-manager").in_namespace("cert-manager"),
        ];
        let cluster = MockCluster::with_objects(objects.clone());

        decommissioner(&cluster)
            .decommission(&objects, PROTECTED_KINDS)
            .await
            .unwrap();

        assert_eq!(
            cluster.operations(),
            vec![
                Operation::Delete(objects[2].key()),
                Operation::Delete(objects[5].key()),
            ]
        );
        let remaining: Vec<String> = cluster.objects().iter().map(|o| o.kind.clone()).collect();
        assert_eq!(
            remaining,
            vec![
                "Namespace",
                "CustomResourceDefinition",
                "MutatingWebhookConfiguration",
                "ValidatingWebhookConfiguration",
            ]
        );
    }

    #[tokio::test]
    async fn test_decommission_tolerates_already_deleted() {
        let deployment = ManagedResource::new("apps/v1", "Deployment", "cert-manager").in_namespace("cert-manager");
        let cluster = MockCluster::new();

        decommissioner(&cluster)
            .decommission(&[deployment], PROTECTED_KINDS)
            .await
            .unwrap();
        assert!(cluster.operations().is_empty());
    }
}
