//! cert-manager install and upgrade
//!
//! [`UpgradeOrchestrator`] ties the pieces together:
//!
//! ```text
//! ensure_installed       probe (strict) -> fetch -> install -> probe
//! ensure_latest_version  list managed -> fetch -> plan -> migrate CRDs
//!                        -> decommission old -> install new -> probe
//! ```
//!
//! Every run starts from the live cluster state, so a failed run can simply
//! be repeated.

use std::sync::Arc;

use certkeeper_core::labels::provenance_selector;
use certkeeper_core::{
    CertManagerConfig, Config, ImageOverrides, ManagedResource, ManifestSource, ObjectKey,
    inspect_images, prepare_components,
};

use crate::accessor::ClusterAccessor;
use crate::backoff::Retrier;
use crate::decommissioner::{PROTECTED_KINDS, ResourceDecommissioner};
use crate::error::{KubeError, Result};
use crate::installer::ResourceInstaller;
use crate::migration::CrdMigrator;
use crate::readiness::{DEFAULT_PROBE_INTERVAL, ReadinessProbe, probe_objects};
use crate::reconciler::{UpgradePlan, determine_upgrade};

/// Namespace cert-manager is installed into
pub const CERT_MANAGER_NAMESPACE: &str = "cert-manager";

/// Namespaces searched for managed objects; older releases put the leader
/// election roles in kube-system
pub const CERT_MANAGER_NAMESPACES: &[&str] = &[CERT_MANAGER_NAMESPACE, "kube-system"];

/// Installs and upgrades cert-manager
pub struct UpgradeOrchestrator {
    config: CertManagerConfig,
    overrides: ImageOverrides,
    source: Arc<dyn ManifestSource>,
    cluster: Arc<dyn ClusterAccessor>,
    migrator: Arc<dyn CrdMigrator>,
    retrier: Retrier,
}

impl UpgradeOrchestrator {
    pub fn new(
        config: &Config,
        source: Arc<dyn ManifestSource>,
        cluster: Arc<dyn ClusterAccessor>,
        migrator: Arc<dyn CrdMigrator>,
    ) -> Self {
        Self {
            config: config.cert_manager.clone(),
            overrides: config.images.clone(),
            source,
            cluster,
            migrator,
            retrier: Retrier::default(),
        }
    }

    /// Use a specific clock, backoff and cancellation token
    pub fn with_retrier(mut self, retrier: Retrier) -> Self {
        self.retrier = retrier;
        self
    }

    /// Desired cert-manager version
    pub fn version(&self) -> &str {
        &self.config.version
    }

    fn installer(&self) -> ResourceInstaller {
        ResourceInstaller::new(self.cluster.clone(), self.retrier.clone())
    }

    fn decommissioner(&self) -> ResourceDecommissioner {
        ResourceDecommissioner::new(self.cluster.clone(), self.retrier.clone())
    }

    fn probe(&self) -> ReadinessProbe {
        ReadinessProbe::new(self.cluster.clone(), self.retrier.clone())
    }

    /// Objects of the desired release, labelled, annotated and with image
    /// overrides applied
    pub async fn desired_objects(&self) -> Result<Vec<ManagedResource>> {
        let version = &self.config.version;
        tracing::debug!(location = self.source.location(), version = %version, "Fetching cert-manager manifest");
        let raw = self.source.fetch(version).await?;
        Ok(prepare_components(&raw, version, &self.overrides)?)
    }

    /// Install cert-manager unless a working one is already present
    pub async fn ensure_installed(&self) -> Result<()> {
        let probe = self.probe();
        let test_objects = probe_objects()?;
        let timeout = self.config.wait_timeout();

        if probe
            .wait_ready(&test_objects, DEFAULT_PROBE_INTERVAL, timeout, true)
            .await
            .is_ok()
        {
            tracing::info!("Skipping installing cert-manager as it is already installed");
            return Ok(());
        }
        if self.retrier.token().is_cancelled() {
            return Err(KubeError::Cancelled);
        }

        tracing::info!(version = %self.config.version, "Installing cert-manager");
        let objects = self.desired_objects().await?;
        self.installer().install(&objects).await?;

        probe
            .wait_ready(&test_objects, DEFAULT_PROBE_INTERVAL, timeout, false)
            .await
    }

    /// Upgrade cert-manager if the installed release is older than the
    /// desired one; does nothing for an externally managed cert-manager
    pub async fn ensure_latest_version(&self) -> Result<()> {
        tracing::info!("Checking cert-manager version...");
        let installed = self.installed_objects().await?;
        if installed.is_empty() {
            tracing::info!("No cert-manager installation managed by certkeeper found, skipping upgrade");
            return Ok(());
        }

        let desired = self.desired_objects().await?;
        let plan = determine_upgrade(&self.config.version, &installed, &desired)?;
        if !plan.should_upgrade {
            tracing::info!(version = %plan.from_version, "cert-manager is already up to date");
            return Ok(());
        }

        tracing::info!(
            from = %plan.from_version,
            to = %plan.to_version,
            "Upgrading cert-manager"
        );

        self.migrator.run(&desired).await?;
        self.decommissioner()
            .decommission(&installed, PROTECTED_KINDS)
            .await?;
        self.installer().install(&desired).await?;

        self.probe()
            .wait_ready(
                &probe_objects()?,
                DEFAULT_PROBE_INTERVAL,
                self.config.wait_timeout(),
                false,
            )
            .await
    }

    /// Compute the upgrade plan without changing the cluster
    ///
    /// An externally managed cert-manager is reported without fetching the
    /// manifest.
    pub async fn plan_upgrade(&self) -> Result<UpgradePlan> {
        let installed = self.installed_objects().await?;
        if installed.is_empty() {
            return Ok(UpgradePlan::externally_managed());
        }
        let desired = self.desired_objects().await?;
        determine_upgrade(&self.config.version, &installed, &desired)
    }

    /// Container images an install would pull; empty when cert-manager's
    /// namespace already exists
    pub async fn images(&self) -> Result<Vec<String>> {
        let namespace = ObjectKey {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
            namespace: None,
            name: CERT_MANAGER_NAMESPACE.to_string(),
        };

        match self.cluster.get(&namespace).await {
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.wrap("get", &namespace)),
        }

        let objects = self.desired_objects().await?;
        Ok(inspect_images(&objects))
    }

    async fn installed_objects(&self) -> Result<Vec<ManagedResource>> {
        let selector = provenance_selector();
        self.retrier
            .run(|| self.cluster.list(&selector, CERT_MANAGER_NAMESPACES))
            .await
    }
}
