//! Cluster accessor backed by the Kubernetes API server
//!
//! Objects are handled as `DynamicObject`s; the API resource for each
//! apiVersion/kind is discovered per call so kinds registered by CRDs earlier
//! in the same run are picked up.

use async_trait::async_trait;
use certkeeper_core::{ManagedResource, ObjectKey};
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::{GroupVersionKind, TypeMeta},
    discovery::{self, ApiCapabilities, ApiResource, Discovery, Scope, verbs},
};
use std::collections::BTreeMap;
use std::path::Path;

use super::{ClusterAccessor, selector_string};
use crate::error::{KubeError, Result};

/// Accessor for a live cluster
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using a kubeconfig file and context, or the inferred defaults
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        if kubeconfig.is_none() && context.is_none() {
            tracing::debug!("Using default kubeconfig");
            let client = Client::try_default()
                .await
                .map_err(|e| KubeError::InvalidConfig(format!("kubeconfig: {}", e)))?;
            return Ok(Self::new(client));
        }

        let loaded = match kubeconfig {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Reading kubeconfig");
                Kubeconfig::read_from(path)
            }
            None => Kubeconfig::read(),
        }
        .map_err(|e| KubeError::InvalidConfig(format!("kubeconfig: {}", e)))?;

        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(loaded, &options)
            .await
            .map_err(|e| KubeError::InvalidConfig(format!("kubeconfig: {}", e)))?;
        let client = Client::try_from(config).map_err(|e| KubeError::InvalidConfig(e.to_string()))?;

        Ok(Self::new(client))
    }

    /// Underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn resolve(&self, api_version: &str, kind: &str) -> Result<(ApiResource, ApiCapabilities)> {
        let gvk = certkeeper_core::GroupVersionKind::from_api_version(api_version, kind);
        let gvk = GroupVersionKind::gvk(&gvk.group, &gvk.version, &gvk.kind);

        discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref resp) if resp.code == 404 => KubeError::UnknownKind {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                },
                kube::Error::Discovery(_) => KubeError::UnknownKind {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                },
                other => KubeError::Api(other),
            })
    }

    fn api(&self, ar: &ApiResource, caps: &ApiCapabilities, namespace: Option<&str>) -> Api<DynamicObject> {
        match (&caps.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, ar),
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), ar),
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), ar),
        }
    }

    async fn api_for(&self, key: &ObjectKey) -> Result<(Api<DynamicObject>, ApiResource)> {
        let (ar, caps) = self.resolve(&key.api_version, &key.kind).await?;
        let api = self.api(&ar, &caps, key.namespace.as_deref());
        Ok((api, ar))
    }
}

fn to_dynamic(obj: &ManagedResource) -> Result<DynamicObject> {
    Ok(serde_json::from_value(obj.to_value()?)?)
}

fn from_dynamic(mut obj: DynamicObject, ar: &ApiResource) -> Result<ManagedResource> {
    // list items come back without apiVersion/kind
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: ar.api_version.clone(),
            kind: ar.kind.clone(),
        });
    }
    Ok(ManagedResource::from_value(serde_json::to_value(&obj)?)?)
}

/// Map 404/409 responses onto the accessor's distinguished errors
fn classify(e: kube::Error, key: &ObjectKey) -> KubeError {
    match e {
        kube::Error::Api(resp) if resp.code == 404 => KubeError::NotFound {
            resource: key.to_string(),
        },
        kube::Error::Api(resp) if resp.code == 409 => KubeError::Conflict {
            resource: key.to_string(),
            message: resp.message,
        },
        other => KubeError::Api(other),
    }
}

#[async_trait]
impl ClusterAccessor for KubeAccessor {
    async fn get(&self, key: &ObjectKey) -> Result<ManagedResource> {
        let (api, ar) = self.api_for(key).await?;
        let obj = api.get(&key.name).await.map_err(|e| classify(e, key))?;
        from_dynamic(obj, &ar)
    }

    async fn create(&self, obj: &ManagedResource) -> Result<ManagedResource> {
        let key = obj.key();
        let (api, ar) = self.api_for(&key).await?;
        let created = api
            .create(&PostParams::default(), &to_dynamic(obj)?)
            .await
            .map_err(|e| classify(e, &key))?;
        from_dynamic(created, &ar)
    }

    async fn update(&self, obj: &ManagedResource) -> Result<ManagedResource> {
        let key = obj.key();
        let (api, ar) = self.api_for(&key).await?;
        let updated = api
            .replace(&key.name, &PostParams::default(), &to_dynamic(obj)?)
            .await
            .map_err(|e| classify(e, &key))?;
        from_dynamic(updated, &ar)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        let (api, _) = self.api_for(key).await?;
        api.delete(&key.name, &DeleteParams::background())
            .await
            .map_err(|e| classify(e, key))?;
        Ok(())
    }

    async fn list(
        &self,
        selector: &BTreeMap<String, String>,
        namespaces: &[&str],
    ) -> Result<Vec<ManagedResource>> {
        let discovery = Discovery::new(self.client.clone()).run().await?;
        let params = ListParams::default().labels(&selector_string(selector));

        let mut objects = Vec::new();
        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if !caps.supports_operation(verbs::LIST) || !caps.supports_operation(verbs::DELETE) {
                    continue;
                }

                let apis: Vec<Api<DynamicObject>> = match caps.scope {
                    Scope::Cluster => vec![Api::all_with(self.client.clone(), &ar)],
                    Scope::Namespaced => namespaces
                        .iter()
                        .map(|ns| Api::namespaced_with(self.client.clone(), ns, &ar))
                        .collect(),
                };

                for api in apis {
                    match api.list(&params).await {
                        Ok(list) => {
                            for item in list.items {
                                objects.push(from_dynamic(item, &ar)?);
                            }
                        }
                        // resource vanished or cannot be listed after all
                        Err(kube::Error::Api(resp)) if resp.code == 404 || resp.code == 405 => {
                            tracing::debug!(kind = %ar.kind, code = resp.code, "Skipping resource in list");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Ok(objects)
    }
}
