//! Common test utilities for reconcile scenarios
//!
//! Builds a [`Reconciler`] over in-memory stores and seeds `NginxSet`
//! objects the way a user would create them.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use nginxset_controller::prelude::*;

pub const NAMESPACE: &str = "default";
pub const NAME: &str = "web";

/// Reconciler plus typed handles on the stores it writes to
pub struct Harness {
    pub ctx: Arc<Reconciler>,
    pub nginxsets: Arc<InMemoryStore<NginxSet>>,
    pub deployments: Arc<InMemoryStore<Deployment>>,
}

impl Harness {
    pub fn new() -> Self {
        let nginxsets: Arc<InMemoryStore<NginxSet>> = Arc::new(InMemoryStore::new());
        let deployments: Arc<InMemoryStore<Deployment>> = Arc::new(InMemoryStore::new());
        let nginxset_store: Arc<dyn ObjectStore<NginxSet>> = nginxsets.clone();
        let deployment_store: Arc<dyn ObjectStore<Deployment>> = deployments.clone();
        let ctx = Arc::new(Reconciler::new(
            nginxset_store,
            deployment_store,
            ControllerConfig::default(),
        ));
        Self {
            ctx,
            nginxsets,
            deployments,
        }
    }

    /// Harness with one `NginxSet` already created
    pub fn with_nginxset(replicas: i32) -> Self {
        let harness = Self::new();
        harness
            .nginxsets
            .insert(&nginxset(replicas))
            .expect("seed nginxset");
        harness
    }

    pub fn nginxset(&self) -> NginxSet {
        self.nginxsets.snapshot(&key()).expect("nginxset present")
    }

    pub fn deployment_replicas(&self) -> Option<i32> {
        self.deployments
            .snapshot(&key())
            .and_then(|d| d.spec)
            .and_then(|spec| spec.replicas)
    }

    pub fn ready(&self) -> Option<Condition> {
        self.nginxset()
            .find_condition(ConditionType::Ready)
            .cloned()
    }

    pub fn failures(&self) -> i64 {
        self.nginxset().failures().get()
    }

    pub fn clear_calls(&self) {
        self.nginxsets.clear_calls();
        self.deployments.clear_calls();
    }
}

pub fn key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, NAME)
}

pub fn nginxset(replicas: i32) -> NginxSet {
    let mut obj = NginxSet::new(NAME, NginxSetSpec { replicas });
    obj.metadata.namespace = Some(NAMESPACE.to_string());
    obj
}

pub fn backend_error(message: &str) -> StoreError {
    StoreError::Backend(message.to_string())
}
