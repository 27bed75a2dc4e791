//! # Status Management
//!
//! Persists the status subresource of a mutated object.
//!
//! The merge patch is computed against a freshly fetched copy rather than the
//! copy the pass started from, so spec or metadata edits made in between are
//! never overwritten. The patch carries the fresh copy's resource version; a
//! concurrent status write fails it with a conflict. Nothing is retried here.

use kube::Resource;
use tracing::debug;

use crate::store::{ObjectKey, ObjectStore, StoreError};

/// Write the status of `obj` back to the store
///
/// A failed re-fetch (including the object having been deleted meanwhile) is
/// reported as [`StoreError::Conflict`].
pub async fn patch_status<K, S>(store: &S, obj: &K) -> Result<K, StoreError>
where
    K: Resource + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let key = ObjectKey::for_resource(obj)?;
    let fresh = store.get(&key).await.map_err(|e| StoreError::Conflict {
        key: key.to_string(),
        message: format!("unable to re-fetch before status patch: {e}"),
    })?;
    debug!(resource = %key, "Patching status against refetched copy");
    store.patch_status(obj, &fresh).await
}
