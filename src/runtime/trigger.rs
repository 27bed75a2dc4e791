//! # Trigger Filter
//!
//! Decides which watch events enqueue a reconcile.
//!
//! An object is admitted the first time it is seen and afterwards only when
//! its `metadata.generation` or its annotations changed. Status-only updates,
//! including the controller's own status writes, never re-trigger.
//!
//! A relist (`Init` .. `InitDone`) replays every live object; anything
//! remembered but not replayed was deleted while the watch was down and is
//! dropped when the relist completes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use kube::{Resource, ResourceExt};

use crate::store::ObjectKey;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    generation: Option<i64>,
    annotations: BTreeMap<String, String>,
}

impl Fingerprint {
    fn of<K: Resource>(obj: &K) -> Self {
        Self {
            generation: obj.meta().generation,
            annotations: obj.annotations().clone(),
        }
    }
}

#[derive(Debug, Default)]
struct FilterState {
    seen: HashMap<ObjectKey, Fingerprint>,
    /// Keys replayed by the relist in progress
    relisted: Option<HashSet<ObjectKey>>,
}

/// Generation-or-annotation change filter keyed by object identity
#[derive(Debug, Default)]
pub struct TriggerFilter {
    state: Mutex<FilterState>,
}

impl TriggerFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FilterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `obj` should enqueue a reconcile; remembers what was seen
    pub fn admit<K: Resource>(&self, obj: &K) -> bool {
        let Ok(key) = ObjectKey::for_resource(obj) else {
            return true;
        };
        let fingerprint = Fingerprint::of(obj);
        let mut state = self.lock();
        if let Some(relisted) = state.relisted.as_mut() {
            relisted.insert(key.clone());
        }
        match state.seen.insert(key, fingerprint.clone()) {
            Some(previous) => previous != fingerprint,
            None => true,
        }
    }

    /// Drop what is remembered about `key`
    pub fn forget(&self, key: &ObjectKey) {
        self.lock().seen.remove(key);
    }

    /// A relist started; track which objects it replays
    pub fn begin_relist(&self) {
        self.lock().relisted = Some(HashSet::new());
    }

    /// A relist completed; forget every object it did not replay
    pub fn finish_relist(&self) {
        let mut state = self.lock();
        if let Some(relisted) = state.relisted.take() {
            state.seen.retain(|key, _| relisted.contains(key));
        }
    }

    /// Number of remembered objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{NginxSet, NginxSetSpec, NginxSetStatus};

    fn nginxset(generation: i64) -> NginxSet {
        named("web", generation)
    }

    fn named(name: &str, generation: i64) -> NginxSet {
        let mut obj = NginxSet::new(name, NginxSetSpec { replicas: 1 });
        obj.metadata.namespace = Some("default".to_string());
        obj.metadata.generation = Some(generation);
        obj
    }

    #[test]
    fn test_first_sight_is_admitted() {
        let filter = TriggerFilter::new();
        assert!(filter.admit(&nginxset(1)));
    }

    #[test]
    fn test_status_only_change_is_dropped() {
        let filter = TriggerFilter::new();
        let mut obj = nginxset(1);
        assert!(filter.admit(&obj));

        obj.status = Some(NginxSetStatus {
            observed_generation: 1,
            ..Default::default()
        });
        obj.metadata.resource_version = Some("42".to_string());
        assert!(!filter.admit(&obj));
    }

    #[test]
    fn test_generation_change_is_admitted() {
        let filter = TriggerFilter::new();
        assert!(filter.admit(&nginxset(1)));
        assert!(filter.admit(&nginxset(2)));
        assert!(!filter.admit(&nginxset(2)));
    }

    #[test]
    fn test_annotation_change_is_admitted() {
        let filter = TriggerFilter::new();
        let mut obj = nginxset(1);
        assert!(filter.admit(&obj));

        obj.annotations_mut()
            .insert("example.io/restart".to_string(), "1".to_string());
        assert!(filter.admit(&obj));
        assert!(!filter.admit(&obj));
    }

    #[test]
    fn test_forget_readmits() {
        let filter = TriggerFilter::new();
        let obj = nginxset(1);
        assert!(filter.admit(&obj));
        filter.forget(&ObjectKey::new("default", "web"));
        assert!(filter.admit(&obj));
    }

    #[test]
    fn test_relist_drops_objects_deleted_while_disconnected() {
        let filter = TriggerFilter::new();
        assert!(filter.admit(&named("kept", 1)));
        assert!(filter.admit(&named("gone", 1)));

        filter.begin_relist();
        assert!(!filter.admit(&named("kept", 1)));
        filter.finish_relist();

        assert_eq!(filter.len(), 1);
        assert!(!filter.admit(&named("kept", 1)));
        assert!(filter.admit(&named("gone", 1)));
    }

    #[test]
    fn test_finish_without_relist_keeps_everything() {
        let filter = TriggerFilter::new();
        assert!(filter.admit(&named("web", 1)));
        filter.finish_relist();
        assert_eq!(filter.len(), 1);
    }
}
