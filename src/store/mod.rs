//! # Object Store
//!
//! Read/write surface the reconciler uses to reach the API server.
//!
//! The reconciler never talks to `kube::Api` directly. It goes through an
//! [`ObjectStore`] so the same pass can run against the cluster
//! ([`KubeStore`]) or against the in-memory emulation ([`InMemoryStore`]).
//!
//! Writes are optimistic: patches carry the resource version of the copy they
//! were computed against, and a stale version fails with [`StoreError::Conflict`].

mod cluster;
pub mod memory;
pub mod merge;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use cluster::KubeStore;
pub use memory::{InMemoryStore, StoreOp};

/// Namespace and name of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object, if it carries both a namespace and a name
    pub fn for_resource<K: kube::Resource>(obj: &K) -> Result<Self, StoreError> {
        let meta = obj.meta();
        match (meta.namespace.as_deref(), meta.name.as_deref()) {
            (Some(namespace), Some(name)) => Ok(Self::new(namespace, name)),
            _ => Err(StoreError::InvalidObject(
                "object is missing namespace or name".to_string(),
            )),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Errors returned by an [`ObjectStore`]
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("conflict writing {key}: {message}")]
    Conflict { key: String, message: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid object: {0}")]
    InvalidObject(String),
}

impl StoreError {
    /// Map a kube client error onto the store taxonomy
    #[must_use]
    pub fn from_kube(err: kube::Error, key: &ObjectKey) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => {
                StoreError::NotFound(key.to_string())
            }
            kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists" => {
                StoreError::AlreadyExists(key.to_string())
            }
            kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
                key: key.to_string(),
                message: api_err.message,
            },
            other => StoreError::Backend(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Read/write surface for one kind of namespaced object
///
/// `patch` and `patch_status` take the object to persist and the `base` copy
/// the merge patch is computed against. The patch is gated on `base`'s
/// resource version.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    /// Fetch the current object
    async fn get(&self, key: &ObjectKey) -> Result<K, StoreError>;

    /// Create a new object
    async fn create(&self, obj: &K) -> Result<K, StoreError>;

    /// Merge-patch everything except status
    async fn patch(&self, obj: &K, base: &K) -> Result<K, StoreError>;

    /// Replace the whole object (status excluded)
    async fn update(&self, obj: &K) -> Result<K, StoreError>;

    /// Merge-patch the status subresource
    ///
    /// Returns `base` unchanged without a write when the status is identical.
    async fn patch_status(&self, obj: &K, base: &K) -> Result<K, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use kube::api::ObjectMeta;

    #[test]
    fn test_object_key_display() {
        assert_eq!(ObjectKey::new("default", "web").to_string(), "default/web");
    }

    #[test]
    fn test_object_key_for_resource() {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("prod".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            ObjectKey::for_resource(&deployment).unwrap(),
            ObjectKey::new("prod", "web")
        );

        let unnamed = Deployment::default();
        assert!(matches!(
            ObjectKey::for_resource(&unnamed),
            Err(StoreError::InvalidObject(_))
        ));
    }

    #[test]
    fn test_kube_error_mapping() {
        let key = ObjectKey::new("default", "web");
        let api_error = |code: u16, reason: &str| {
            kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "boom".to_string(),
                reason: reason.to_string(),
                code,
            })
        };

        assert!(StoreError::from_kube(api_error(404, "NotFound"), &key).is_not_found());
        assert!(matches!(
            StoreError::from_kube(api_error(409, "AlreadyExists"), &key),
            StoreError::AlreadyExists(_)
        ));
        assert!(StoreError::from_kube(api_error(409, "Conflict"), &key).is_conflict());
        assert!(matches!(
            StoreError::from_kube(api_error(500, "InternalError"), &key),
            StoreError::Backend(_)
        ));
    }
}
