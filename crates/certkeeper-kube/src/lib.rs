//! certkeeper Kube - cert-manager lifecycle against a Kubernetes cluster
//!
//! This crate provides:
//! - `ClusterAccessor`: object access, backed by kube-rs or an in-memory mock
//! - `ResourceInstaller` / `ResourceDecommissioner`: idempotent create-or-update and delete
//! - `ReadinessProbe`: waits until the cert-manager API accepts objects
//! - `determine_upgrade`: install-vs-desired version decision
//! - `CrdMigrator`: custom resource storage version migration
//! - `UpgradeOrchestrator`: ensure-installed and ensure-latest-version
//!
//! Retries and polls run on an injectable [`Clock`] and stop promptly when the
//! caller's cancellation token fires.

pub mod accessor;
pub mod backoff;
pub mod clock;
pub mod decommissioner;
pub mod error;
pub mod installer;
pub mod migration;
pub mod ordering;
pub mod orchestrator;
pub mod poll;
pub mod readiness;
pub mod reconciler;

pub use accessor::{ClusterAccessor, KubeAccessor, MockCluster, Operation, OperationCounts};
pub use backoff::{Backoff, Retrier, retry};
pub use clock::{Clock, ManualClock, TokioClock};
pub use decommissioner::{PROTECTED_KINDS, ResourceDecommissioner};
pub use error::{KubeError, Result};
pub use installer::ResourceInstaller;
pub use migration::{CrdMigrator, KubeCrdMigrator, MigrationDecision, plan_migration};
pub use ordering::{ResourceCategory, sort_for_install};
pub use orchestrator::{CERT_MANAGER_NAMESPACE, CERT_MANAGER_NAMESPACES, UpgradeOrchestrator};
pub use poll::poll_immediate;
pub use readiness::{DEFAULT_PROBE_INTERVAL, ReadinessProbe, probe_objects};
pub use reconciler::{SERVER_GENERATED_KINDS, UpgradePlan, determine_upgrade};

/// Re-export the cancellation token type callers pass in
pub use tokio_util::sync::CancellationToken;
