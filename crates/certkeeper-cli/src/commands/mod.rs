//! CLI command implementations

pub mod images;
pub mod install;
pub mod plan;
pub mod upgrade;

use std::path::PathBuf;
use std::sync::Arc;

use certkeeper_core::Config;
use certkeeper_kube::{
    CancellationToken, KubeAccessor, KubeCrdMigrator, Retrier, TokioClock, UpgradeOrchestrator,
};
use certkeeper_repo::create_source;

use crate::error::Result;

/// Global options shared by every command
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
    pub kube_context: Option<String>,
    pub token: CancellationToken,
}

impl Context {
    /// Load the configuration; an explicit path must exist
    pub fn load_config(&self) -> Result<Config> {
        Ok(Config::load_or_default(self.config_path.as_deref())?)
    }

    /// Build the orchestrator against the selected cluster
    ///
    /// Configuration and manifest location are validated before connecting.
    pub async fn orchestrator(&self) -> Result<UpgradeOrchestrator> {
        let config = self.load_config()?;
        let source = create_source(&config.cert_manager.url)?;

        let accessor =
            KubeAccessor::connect(self.kubeconfig.as_deref(), self.kube_context.as_deref()).await?;
        let retrier = Retrier::new(Arc::new(TokioClock), self.token.clone());
        let migrator = KubeCrdMigrator::new(accessor.client().clone(), retrier.clone());

        Ok(
            UpgradeOrchestrator::new(&config, source, Arc::new(accessor), Arc::new(migrator))
                .with_retrier(retrier),
        )
    }
}
