//! Install ordering
//!
//! Objects are created so that what others depend on exists first: the
//! namespace, then CRDs, then storage, configuration, identities and RBAC,
//! and only then workloads and everything else.

use certkeeper_core::ManagedResource;

/// Resource categories in install order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceCategory {
    /// Namespace - created before namespace-scoped resources
    Namespace = 0,
    /// CustomResourceDefinition
    Crd = 1,
    /// StorageClass, PersistentVolume, PersistentVolumeClaim
    Storage = 10,
    /// Secret, ConfigMap
    Config = 11,
    /// ServiceAccount
    ServiceAccount = 12,
    /// LimitRange, ResourceQuota
    NamespaceConfig = 13,
    /// ClusterRole, ClusterRoleBinding, Role, RoleBinding
    Rbac = 20,
    /// Service, NetworkPolicy, Ingress
    Network = 30,
    /// Pod, ReplicaSet, Deployment, StatefulSet, DaemonSet
    Workload = 40,
    /// Job, CronJob
    Batch = 50,
    /// Webhook configurations, APIServices and everything else
    Other = 100,
}

impl ResourceCategory {
    /// Categorize a resource by its kind
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "Namespace" => Self::Namespace,
            "CustomResourceDefinition" => Self::Crd,
            "StorageClass" | "PersistentVolume" | "PersistentVolumeClaim" => Self::Storage,
            "Secret" | "ConfigMap" => Self::Config,
            "ServiceAccount" => Self::ServiceAccount,
            "LimitRange" | "ResourceQuota" => Self::NamespaceConfig,
            "ClusterRole" | "ClusterRoleBinding" | "Role" | "RoleBinding" => Self::Rbac,
            "Service" | "NetworkPolicy" | "Ingress" => Self::Network,
            "Pod" | "ReplicaSet" | "Deployment" | "StatefulSet" | "DaemonSet" => Self::Workload,
            "Job" | "CronJob" => Self::Batch,
            _ => Self::Other,
        }
    }
}

/// Sort objects into install order, keeping manifest order within a category
pub fn sort_for_install(objects: &[ManagedResource]) -> Vec<&ManagedResource> {
    let mut sorted: Vec<&ManagedResource> = objects.iter().collect();
    sorted.sort_by_key(|obj| ResourceCategory::from_kind(&obj.kind));
    sorted
}
