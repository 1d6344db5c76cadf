//! CRD storage version migration
//!
//! Before a new CRD that drops an old stored version can be applied, every
//! custom resource must be re-written at the current storage version and the
//! old version removed from `status.storedVersions`; otherwise the API server
//! rejects the new CRD.

use async_trait::async_trait;
use certkeeper_core::ManagedResource;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Client,
    api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    core::TypeMeta,
    discovery::ApiResource,
};
use std::collections::BTreeSet;

use crate::backoff::Retrier;
use crate::error::{KubeError, Result};

const CRD_KIND: &str = "CustomResourceDefinition";

/// Page size when listing custom resources
pub const LIST_PAGE_SIZE: u32 = 500;

/// Migrates custom resources ahead of a CRD upgrade
#[async_trait]
pub trait CrdMigrator: Send + Sync {
    /// Migrate the custom resources of every CRD in `objects` that needs it
    async fn run(&self, objects: &[ManagedResource]) -> Result<()>;
}

/// What a CRD upgrade requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationDecision {
    /// The CRD is not installed yet
    NotInstalled,
    /// Every stored version is still part of the new CRD
    UpToDate,
    /// Custom resources must be re-stored at `storage_version`
    Migrate { storage_version: String },
}

/// Compare the installed CRD with the one about to be applied
pub fn plan_migration(
    live: Option<&CustomResourceDefinition>,
    desired: &CustomResourceDefinition,
) -> Result<MigrationDecision> {
    let Some(live) = live else {
        return Ok(MigrationDecision::NotInstalled);
    };
    let crd = desired.metadata.name.clone().unwrap_or_default();

    let storage_version = live
        .spec
        .versions
        .iter()
        .find(|v| v.storage)
        .map(|v| v.name.clone())
        .ok_or_else(|| KubeError::Migration {
            crd: crd.clone(),
            message: "installed CRD has no storage version".to_string(),
        })?;

    let new_versions: BTreeSet<&str> = desired.spec.versions.iter().map(|v| v.name.as_str()).collect();
    if !new_versions.contains(storage_version.as_str()) {
        return Err(KubeError::Migration {
            crd,
            message: format!(
                "storage version '{}' of the installed CRD is missing from the new CRD",
                storage_version
            ),
        });
    }

    let stored_versions = live
        .status
        .as_ref()
        .and_then(|s| s.stored_versions.clone())
        .unwrap_or_default();
    if stored_versions.iter().all(|v| new_versions.contains(v.as_str())) {
        return Ok(MigrationDecision::UpToDate);
    }

    Ok(MigrationDecision::Migrate { storage_version })
}

/// CRD migrator talking to the API server
#[derive(Clone)]
pub struct KubeCrdMigrator {
    client: Client,
    retrier: Retrier,
}

impl KubeCrdMigrator {
    pub fn new(client: Client, retrier: Retrier) -> Self {
        Self { client, retrier }
    }

    async fn migrate(&self, desired: &CustomResourceDefinition) -> Result<()> {
        let name = desired.metadata.name.clone().unwrap_or_default();
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());

        let live = {
            let (crds, name) = (&crds, name.as_str());
            self.retrier
                .run(|| async move { crds.get_opt(name).await.map_err(KubeError::from) })
                .await
                .map_err(|e| migration_error(name, "failed to read installed CRD", e))?
        };

        let storage_version = match plan_migration(live.as_ref(), desired)? {
            MigrationDecision::NotInstalled | MigrationDecision::UpToDate => {
                tracing::debug!(crd = %name, "No CRD migration needed");
                return Ok(());
            }
            MigrationDecision::Migrate { storage_version } => storage_version,
        };

        tracing::info!(
            crd = %name,
            storage_version = %storage_version,
            "Migrating custom resources, this operation may take a while..."
        );

        let group = &desired.spec.group;
        let resource = ApiResource {
            group: group.clone(),
            version: storage_version.clone(),
            api_version: format!("{}/{}", group, storage_version),
            kind: desired.spec.names.kind.clone(),
            plural: desired.spec.names.plural.clone(),
        };
        let migrated = self.restore_all(&name, &resource).await?;

        let patch = serde_json::json!({ "status": { "storedVersions": [storage_version] } });
        {
            let (crds, name, patch) = (&crds, name.as_str(), &patch);
            self.retrier
                .run(|| async move {
                    crds.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
                        .await
                        .map_err(KubeError::from)
                })
                .await
                .map_err(|e| migration_error(name, "failed to update stored versions", e))?;
        }

        tracing::info!(crd = %name, count = migrated, "Custom resources migrated");
        Ok(())
    }

    /// Re-write every custom resource so it is stored at the current version
    async fn restore_all(&self, crd: &str, resource: &ApiResource) -> Result<usize> {
        let all: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        let mut continue_token: Option<String> = None;
        let mut migrated = 0;

        loop {
            let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let page = {
                let (all, params) = (&all, &params);
                self.retrier
                    .run(|| async move { all.list(params).await.map_err(KubeError::from) })
                    .await
                    .map_err(|e| {
                        migration_error(crd, &format!("failed to list {}", resource.plural), e)
                    })?
            };

            for mut item in page.items {
                item.types = Some(TypeMeta {
                    api_version: resource.api_version.clone(),
                    kind: resource.kind.clone(),
                });
                self.restore(&item, resource)
                    .await
                    .map_err(|e| KubeError::Migration {
                        crd: crd.to_string(),
                        message: e.to_string(),
                    })?;
                migrated += 1;
            }

            continue_token = page.metadata.continue_.filter(|t| !t.is_empty());
            if continue_token.is_none() {
                return Ok(migrated);
            }
        }
    }

    async fn restore(&self, item: &DynamicObject, resource: &ApiResource) -> Result<()> {
        let name = item.metadata.name.clone().unwrap_or_default();
        let api: Api<DynamicObject> = match &item.metadata.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        };

        let (api, name) = (&api, name.as_str());
        self.retrier
            .run(|| async move {
                let result = api.replace(name, &PostParams::default(), item).await;
                skip_concurrent_change(name, result.map(drop).map_err(KubeError::from))
            })
            .await
    }
}

/// A conflict or a missing object means a concurrent write or delete already
/// re-stored the custom resource; report success so it is not retried
fn skip_concurrent_change(name: &str, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_conflict() || e.is_not_found() => {
            tracing::debug!(name, error = %e, "Custom resource changed concurrently, skipping");
            Ok(())
        }
        other => other,
    }
}

fn migration_error(crd: &str, action: &str, source: KubeError) -> KubeError {
    KubeError::Migration {
        crd: crd.to_string(),
        message: format!("{}: {}", action, source),
    }
}

#[async_trait]
impl CrdMigrator for KubeCrdMigrator {
    async fn run(&self, objects: &[ManagedResource]) -> Result<()> {
        for obj in objects.iter().filter(|o| o.kind == CRD_KIND) {
            let desired: CustomResourceDefinition = serde_json::from_value(obj.to_value()?)?;
            self.migrate(&desired).await?;
        }
        Ok(())
    }
}
