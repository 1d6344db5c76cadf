//! Readiness probing of the cert-manager API
//!
//! cert-manager is ready once its webhook admits an `Issuer` and a
//! `Certificate`. The probe creates a small set of test objects until the API
//! server accepts all of them, then removes them again.

use std::sync::Arc;
use std::time::Duration;

use certkeeper_core::{ManagedResource, decode_manifest};

use crate::accessor::ClusterAccessor;
use crate::backoff::Retrier;
use crate::decommissioner::ResourceDecommissioner;
use crate::error::Result;
use crate::installer::ResourceInstaller;
use crate::poll::poll_immediate;

/// Interval between probe attempts
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

const TEST_RESOURCES: &str = include_str!("../assets/cert-manager-test-resources.yaml");

/// The embedded probe objects: a namespace, a self-signed `Issuer` and a
/// `Certificate` issued by it
pub fn probe_objects() -> Result<Vec<ManagedResource>> {
    Ok(decode_manifest(TEST_RESOURCES.as_bytes())?)
}

/// Waits for the cert-manager API to accept objects
#[derive(Clone)]
pub struct ReadinessProbe {
    installer: ResourceInstaller,
    decommissioner: ResourceDecommissioner,
    retrier: Retrier,
}

impl ReadinessProbe {
    pub fn new(cluster: Arc<dyn ClusterAccessor>, retrier: Retrier) -> Self {
        Self {
            installer: ResourceInstaller::new(cluster.clone(), retrier.clone()),
            decommissioner: ResourceDecommissioner::new(cluster, retrier.clone()),
            retrier,
        }
    }

    /// Create every test object, polling every `interval` until all are
    /// accepted or `timeout` elapses, then delete them in reverse order
    ///
    /// In strict mode the first rejected object fails the wait immediately;
    /// otherwise rejections are retried on the next tick.
    pub async fn wait_ready(
        &self,
        test_objects: &[ManagedResource],
        interval: Duration,
        timeout: Duration,
        strict: bool,
    ) -> Result<()> {
        if !strict {
            tracing::info!("Waiting for cert-manager to be available...");
        }

        poll_immediate(
            self.retrier.clock(),
            self.retrier.token(),
            interval,
            timeout,
            || self.try_create_all(test_objects, strict),
        )
        .await?;

        for obj in test_objects.iter().rev() {
            let key = obj.key();
            self.retrier.run(|| self.decommissioner.delete(&key)).await?;
        }

        Ok(())
    }

    async fn try_create_all(&self, test_objects: &[ManagedResource], strict: bool) -> Result<bool> {
        for obj in test_objects {
            if let Err(e) = self.installer.apply(obj).await {
                if strict || e.is_cancelled() {
                    return Err(e);
                }
                tracing::debug!(error = %e, "cert-manager API not ready yet");
                return Ok(false);
            }
        }
        Ok(true)
    }
}
