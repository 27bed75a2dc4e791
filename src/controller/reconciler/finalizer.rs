//! # Finalizer
//!
//! Finalizer lifecycle for reconciled objects.
//!
//! | finalizer | deleting | action                                   |
//! |-----------|----------|------------------------------------------|
//! | absent    | no       | add it, merge-patch against the old copy |
//! | present   | no       | nothing                                  |
//! | any       | yes      | remove it, persist with a full update    |
//!
//! The managed Deployment is garbage collected through its owner reference,
//! so deletion needs no explicit cleanup.

use kube::{Resource, ResourceExt};
use tracing::info;

use crate::store::{ObjectStore, StoreError};

#[must_use]
pub fn has_finalizer<K: Resource>(obj: &K, finalizer: &str) -> bool {
    obj.finalizers().iter().any(|f| f == finalizer)
}

#[must_use]
pub fn is_deleting<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

/// Add `finalizer` to a live object that lacks it
///
/// On success `obj` is replaced by the stored copy. Returns whether a write
/// happened.
pub async fn ensure_finalizer<K, S>(
    store: &S,
    obj: &mut K,
    finalizer: &str,
) -> Result<bool, StoreError>
where
    K: Resource + Clone + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    if is_deleting(obj) || has_finalizer(obj, finalizer) {
        return Ok(false);
    }

    let base = obj.clone();
    obj.finalizers_mut().push(finalizer.to_string());
    *obj = store.patch(obj, &base).await?;
    info!(
        resource.namespace = %obj.namespace().unwrap_or_default(),
        resource.name = %obj.name_any(),
        finalizer,
        "Registered finalizer"
    );
    Ok(true)
}

/// Remove `finalizer` and persist the object with a full update
///
/// Once the last finalizer is gone the API server completes the deletion.
pub async fn remove_finalizer<K, S>(store: &S, obj: &mut K, finalizer: &str) -> Result<K, StoreError>
where
    K: Resource + Clone + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    obj.finalizers_mut().retain(|f| f != finalizer);
    store.update(obj).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NGINXSET_FINALIZER;
    use crate::crd::{NginxSet, NginxSetSpec};
    use crate::store::{InMemoryStore, ObjectKey, StoreOp};

    fn key() -> ObjectKey {
        ObjectKey::new("default", "web")
    }

    fn stored(store: &InMemoryStore<NginxSet>, finalizers: &[&str]) -> NginxSet {
        let mut obj = NginxSet::new("web", NginxSetSpec { replicas: 1 });
        obj.metadata.namespace = Some("default".to_string());
        obj.metadata.finalizers = Some(finalizers.iter().map(|f| (*f).to_string()).collect());
        store.insert(&obj).unwrap()
    }

    #[tokio::test]
    async fn test_missing_finalizer_is_added() {
        let store = InMemoryStore::new();
        let mut obj = stored(&store, &[]);

        assert!(ensure_finalizer(&store, &mut obj, NGINXSET_FINALIZER).await.unwrap());
        assert!(has_finalizer(&obj, NGINXSET_FINALIZER));
        assert!(has_finalizer(&store.snapshot(&key()).unwrap(), NGINXSET_FINALIZER));
        assert_eq!(store.calls(StoreOp::Patch), 1);
    }

    #[tokio::test]
    async fn test_present_finalizer_is_left_alone() {
        let store = InMemoryStore::new();
        let mut obj = stored(&store, &[NGINXSET_FINALIZER]);

        assert!(!ensure_finalizer(&store, &mut obj, NGINXSET_FINALIZER).await.unwrap());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_other_finalizers_are_kept() {
        let store = InMemoryStore::new();
        let mut obj = stored(&store, &["example.io/other"]);

        ensure_finalizer(&store, &mut obj, NGINXSET_FINALIZER).await.unwrap();
        let persisted = store.snapshot(&key()).unwrap();
        assert_eq!(
            persisted.finalizers(),
            ["example.io/other".to_string(), NGINXSET_FINALIZER.to_string()]
        );
    }

    #[tokio::test]
    async fn test_patch_failure_is_surfaced() {
        let store = InMemoryStore::new();
        let mut obj = stored(&store, &[]);
        store.fail_next(StoreOp::Patch, StoreError::Backend("apiserver unavailable".to_string()));

        let err = ensure_finalizer(&store, &mut obj, NGINXSET_FINALIZER).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(!has_finalizer(&store.snapshot(&key()).unwrap(), NGINXSET_FINALIZER));
    }

    #[tokio::test]
    async fn test_removal_completes_deletion() {
        let store = InMemoryStore::new();
        stored(&store, &[NGINXSET_FINALIZER]);
        store.request_deletion(&key()).unwrap();
        let mut obj = store.snapshot(&key()).unwrap();
        assert!(is_deleting(&obj));

        remove_finalizer(&store, &mut obj, NGINXSET_FINALIZER).await.unwrap();
        assert!(!store.contains(&key()));
        assert_eq!(store.calls(StoreOp::Update), 1);
    }
}
