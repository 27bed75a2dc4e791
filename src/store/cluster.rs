//! # Cluster Store
//!
//! [`ObjectStore`] backed by the Kubernetes API through `kube::Api`.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::constants::FIELD_MANAGER;
use crate::store::{merge, ObjectKey, ObjectStore, StoreError};

/// Namespaced object store using the cluster API server
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<K> KubeStore<K> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<K, StoreError> {
        self.api(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(e, key))
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        debug!(resource = %key, kind = %K::kind(&()), "Creating object");
        self.api(&key.namespace)
            .create(&post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &key))
    }

    async fn patch(&self, obj: &K, base: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let patch = merge::object_patch(base, obj)?;
        debug!(resource = %key, kind = %K::kind(&()), "Merge-patching object");
        self.api(&key.namespace)
            .patch(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &key))
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        debug!(resource = %key, kind = %K::kind(&()), "Replacing object");
        self.api(&key.namespace)
            .replace(&key.name, &post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &key))
    }

    async fn patch_status(&self, obj: &K, base: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let Some(patch) = merge::status_patch(base, obj)? else {
            debug!(resource = %key, "Status unchanged, skipping patch");
            return Ok(base.clone());
        };
        self.api(&key.namespace)
            .patch_status(&key.name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &key))
    }
}
