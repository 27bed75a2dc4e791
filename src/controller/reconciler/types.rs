//! # Types
//!
//! Core types for the reconciler.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::crd::NginxSet;
use crate::store::{KubeStore, ObjectKey, ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("unable to register finalizer on {key}: {source}")]
    FinalizerRegistration {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("unable to remove finalizer from {key}: {source}")]
    Deletion {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("unable to update status of {key}: {source}")]
    StatusPatch {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to sync deployment {key}: {source}")]
    ChildSync {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("object has no namespace or name")]
    MissingObjectKey,

    #[error("cannot build owner reference from {0}: name or uid missing")]
    OwnerReference(ObjectKey),
}

impl ReconcilerError {
    /// Short label used for the error metric
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            ReconcilerError::Fetch { .. } => "fetch",
            ReconcilerError::FinalizerRegistration { .. } => "finalizer_registration",
            ReconcilerError::Deletion { .. } => "deletion",
            ReconcilerError::StatusPatch { .. } => "status_patch",
            ReconcilerError::ChildSync { .. } => "child_sync",
            ReconcilerError::MissingObjectKey => "missing_object_key",
            ReconcilerError::OwnerReference(_) => "owner_reference",
        }
    }

    /// Underlying store error, if any
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ReconcilerError::Fetch { source, .. }
            | ReconcilerError::FinalizerRegistration { source, .. }
            | ReconcilerError::Deletion { source, .. }
            | ReconcilerError::StatusPatch { source, .. }
            | ReconcilerError::ChildSync { source, .. } => Some(source),
            ReconcilerError::MissingObjectKey | ReconcilerError::OwnerReference(_) => None,
        }
    }
}

/// Shared context handed to every reconcile pass
///
/// Stores are injected so the same pass runs against the cluster or an
/// in-memory emulation.
#[derive(Clone)]
pub struct Reconciler {
    pub nginxsets: Arc<dyn ObjectStore<NginxSet>>,
    pub deployments: Arc<dyn ObjectStore<Deployment>>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        nginxsets: Arc<dyn ObjectStore<NginxSet>>,
        deployments: Arc<dyn ObjectStore<Deployment>>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            nginxsets,
            deployments,
            config,
        }
    }

    /// Context backed by the cluster API server
    #[must_use]
    pub fn from_client(client: &Client, config: ControllerConfig) -> Self {
        Self::new(
            Arc::new(KubeStore::<NginxSet>::new(client.clone())),
            Arc::new(KubeStore::<Deployment>::new(client.clone())),
            config,
        )
    }
}

/// Key of a reconciled object, or [`ReconcilerError::MissingObjectKey`]
pub(crate) fn object_key<K: kube::Resource>(obj: &K) -> Result<ObjectKey, ReconcilerError> {
    ObjectKey::for_resource(obj).map_err(|_err| ReconcilerError::MissingObjectKey)
}
