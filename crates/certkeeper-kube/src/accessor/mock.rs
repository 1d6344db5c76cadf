//! In-memory cluster for testing
//!
//! Behaves like an API server for the operations the lifecycle manager uses:
//! resourceVersion bookkeeping and conflict detection, not-found errors, label
//! selection, kinds that only become available once their CRD is installed,
//! and injected failures.

use async_trait::async_trait;
use certkeeper_core::{ManagedResource, ObjectKey};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ClusterAccessor;
use crate::error::{KubeError, Result};

/// In-memory cluster
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

#[derive(Default)]
struct MockState {
    objects: IndexMap<ObjectKey, ManagedResource>,
    next_resource_version: u64,
    counts: OperationCounts,
    log: Vec<Operation>,
    /// kind -> number of create calls still to fail
    create_failures: HashMap<String, usize>,
    /// kind -> name of the CRD that must exist before the kind is served
    crd_gated: HashMap<String, String>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

/// A recorded write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create(ObjectKey),
    Update(ObjectKey),
    Delete(ObjectKey),
}

impl Operation {
    pub fn key(&self) -> &ObjectKey {
        match self {
            Operation::Create(key) | Operation::Update(key) | Operation::Delete(key) => key,
        }
    }
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated objects
    pub fn with_objects(objects: impl IntoIterator<Item = ManagedResource>) -> Self {
        let cluster = Self::new();
        {
            let mut state = cluster.write();
            for obj in objects {
                state.store(obj);
            }
        }
        cluster
    }

    /// Serve `kind` only once the CRD named `crd_name` exists
    pub fn serve_kind_after_crd(&self, kind: &str, crd_name: &str) {
        self.write()
            .crd_gated
            .insert(kind.to_string(), crd_name.to_string());
    }

    /// Fail the next `times` creates of `kind` with a server error
    pub fn fail_creates(&self, kind: &str, times: usize) {
        self.write().create_failures.insert(kind.to_string(), times);
    }

    /// Insert or overwrite an object without recording an operation
    pub fn insert(&self, obj: ManagedResource) {
        self.write().store(obj);
    }

    /// Live copy of an object
    pub fn object(&self, key: &ObjectKey) -> Option<ManagedResource> {
        self.read().objects.get(key).cloned()
    }

    /// Every stored object, in insertion order
    pub fn objects(&self) -> Vec<ManagedResource> {
        self.read().objects.values().cloned().collect()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.read().counts.clone()
    }

    /// Writes performed so far, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.read().log.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockState {
    fn store(&mut self, mut obj: ManagedResource) -> ManagedResource {
        self.next_resource_version += 1;
        obj.set_resource_version(Some(self.next_resource_version.to_string()));
        self.objects.insert(obj.key(), obj.clone());
        obj
    }

    fn is_served(&self, kind: &str) -> bool {
        match self.crd_gated.get(kind) {
            None => true,
            Some(crd_name) => self
                .objects
                .keys()
                .any(|k| k.kind == "CustomResourceDefinition" && &k.name == crd_name),
        }
    }

    fn check_served(&self, key: &ObjectKey) -> Result<()> {
        if self.is_served(&key.kind) {
            Ok(())
        } else {
            Err(KubeError::UnknownKind {
                api_version: key.api_version.clone(),
                kind: key.kind.clone(),
            })
        }
    }
}

fn server_error(key: &ObjectKey) -> KubeError {
    KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("internal error creating {}", key),
        reason: "InternalError".to_string(),
        code: 500,
    }))
}

#[async_trait]
impl ClusterAccessor for MockCluster {
    async fn get(&self, key: &ObjectKey) -> Result<ManagedResource> {
        let mut state = self.write();
        state.counts.gets += 1;
        state.check_served(key)?;

        state.objects.get(key).cloned().ok_or_else(|| KubeError::NotFound {
            resource: key.to_string(),
        })
    }

    async fn create(&self, obj: &ManagedResource) -> Result<ManagedResource> {
        let key = obj.key();
        let mut state = self.write();
        state.counts.creates += 1;
        state.check_served(&key)?;

        if let Some(remaining) = state.create_failures.get_mut(&key.kind) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(server_error(&key));
            }
        }

        if state.objects.contains_key(&key) {
            return Err(KubeError::Conflict {
                resource: key.to_string(),
                message: "already exists".to_string(),
            });
        }

        state.log.push(Operation::Create(key));
        Ok(state.store(obj.clone()))
    }

    async fn update(&self, obj: &ManagedResource) -> Result<ManagedResource> {
        let key = obj.key();
        let mut state = self.write();
        state.counts.updates += 1;
        state.check_served(&key)?;

        let live = state.objects.get(&key).ok_or_else(|| KubeError::NotFound {
            resource: key.to_string(),
        })?;

        if let Some(expected) = obj.resource_version() {
            if live.resource_version() != Some(expected) {
                return Err(KubeError::Conflict {
                    resource: key.to_string(),
                    message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
                });
            }
        }

        state.log.push(Operation::Update(key));
        Ok(state.store(obj.clone()))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.write();
        state.counts.deletes += 1;
        state.check_served(key)?;

        if state.objects.shift_remove(key).is_none() {
            return Err(KubeError::NotFound {
                resource: key.to_string(),
            });
        }
        state.log.push(Operation::Delete(key.clone()));
        Ok(())
    }

    async fn list(
        &self,
        selector: &BTreeMap<String, String>,
        namespaces: &[&str],
    ) -> Result<Vec<ManagedResource>> {
        let mut state = self.write();
        state.counts.lists += 1;

        let matches = state
            .objects
            .values()
            .filter(|obj| state.is_served(&obj.kind))
            .filter(|obj| match obj.namespace() {
                Some(ns) => namespaces.contains(&ns),
                None => true,
            })
            .filter(|obj| {
                selector
                    .iter()
                    .all(|(k, v)| obj.labels().get(k) == Some(v))
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}
