//! # In-Memory Store
//!
//! [`ObjectStore`] that emulates the parts of the API server the reconciler
//! relies on:
//!
//! - every write bumps `metadata.resourceVersion`
//! - a write carrying a stale resource version fails with `Conflict`
//! - `metadata.generation` starts at 1 and moves when `spec` changes
//! - main-resource writes never touch `status`, status writes touch nothing else
//! - an object with a deletion timestamp disappears once its finalizers are gone
//!
//! Every request that reaches the emulated server is recorded per [`StoreOp`],
//! and failures can be queued per operation with [`InMemoryStore::fail_next`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::{merge, ObjectKey, ObjectStore, StoreError};

/// Store operation, used for call accounting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Patch,
    Update,
    PatchStatus,
}

impl StoreOp {
    /// Whether the operation writes to the store
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, StoreOp::Get)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteScope {
    Main,
    Status,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    last_version: u64,
    last_uid: u64,
    calls: Vec<(StoreOp, ObjectKey)>,
    injected: HashMap<StoreOp, VecDeque<StoreError>>,
}

impl State {
    fn record(&mut self, op: StoreOp, key: &ObjectKey) -> Result<(), StoreError> {
        self.calls.push((op, key.clone()));
        match self.injected.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    fn next_uid(&mut self) -> String {
        self.last_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.last_uid)
    }

    fn current(&self, key: &ObjectKey) -> Result<&Value, StoreError> {
        self.objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Store `next` as the new revision of `key`, returning what was stored
    fn commit(&mut self, key: &ObjectKey, mut next: Value) -> Value {
        let version = self.next_version();
        set_meta(&mut next, "resourceVersion", Value::String(version));

        let deleting = next.pointer("/metadata/deletionTimestamp").is_some();
        let finalizers_left = next
            .pointer("/metadata/finalizers")
            .and_then(Value::as_array)
            .is_some_and(|f| !f.is_empty());
        if deleting && !finalizers_left {
            self.objects.remove(key);
        } else {
            self.objects.insert(key.clone(), next.clone());
        }
        next
    }

    /// Validate an optimistic-concurrency token against the stored copy
    fn check_version(
        &self,
        key: &ObjectKey,
        current: &Value,
        expected: Option<&str>,
    ) -> Result<(), StoreError> {
        match expected {
            Some(expected) if Some(expected) != merge::resource_version(current) => {
                Err(StoreError::Conflict {
                    key: key.to_string(),
                    message: format!(
                        "the object has been modified; resource version {expected} is stale"
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    fn write_patch(
        &mut self,
        key: &ObjectKey,
        mut patch: Value,
        scope: WriteScope,
    ) -> Result<Value, StoreError> {
        let current = self.current(key)?.clone();
        let expected = merge::resource_version(&patch).map(str::to_string);
        self.check_version(key, &current, expected.as_deref())?;

        if let Some(Value::Object(meta)) = patch.get_mut("metadata") {
            meta.remove("resourceVersion");
        }

        let mut next = current.clone();
        merge::apply(&mut next, &patch);
        let next = match scope {
            WriteScope::Main => with_status_of(next, &current),
            WriteScope::Status => with_status_of(current.clone(), &next),
        };
        let next = bump_generation(next, &current);
        Ok(self.commit(key, next))
    }
}

fn set_meta(obj: &mut Value, field: &str, value: Value) {
    if let Value::Object(map) = obj {
        let meta = map
            .entry("metadata")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(meta) = meta {
            meta.insert(field.to_string(), value);
        }
    }
}

/// Replace the status of `obj` with the status held by `source`
fn with_status_of(mut obj: Value, source: &Value) -> Value {
    if let Value::Object(map) = &mut obj {
        match source.get("status") {
            Some(status) => {
                map.insert("status".to_string(), status.clone());
            }
            None => {
                map.remove("status");
            }
        }
    }
    obj
}

/// Increment `metadata.generation` when `spec` differs from `previous`
fn bump_generation(mut next: Value, previous: &Value) -> Value {
    if next.get("spec") != previous.get("spec") {
        let generation = previous
            .pointer("/metadata/generation")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        set_meta(&mut next, "generation", Value::from(generation + 1));
    } else if let Some(generation) = previous.pointer("/metadata/generation").cloned() {
        set_meta(&mut next, "generation", generation);
    }
    next
}

/// API-server emulation for one kind of namespaced object
pub struct InMemoryStore<K> {
    state: Mutex<State>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Default for InMemoryStore<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            _kind: PhantomData,
        }
    }
}

impl<K> Debug for InMemoryStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryStore")
            .field("kind", &std::any::type_name::<K>())
            .field("objects", &state.objects.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl<K> InMemoryStore<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an error for the next call of `op`
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.lock().injected.entry(op).or_default().push_back(err);
    }

    /// Number of recorded calls of `op`
    #[must_use]
    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.iter().filter(|(o, _)| *o == op).count()
    }

    /// Number of recorded write calls
    #[must_use]
    pub fn writes(&self) -> usize {
        self.lock().calls.iter().filter(|(o, _)| o.is_write()).count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.lock().objects.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    /// Mark an object for deletion the way the API server does on DELETE
    ///
    /// Objects without finalizers are removed straight away.
    pub fn request_deletion(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut state = self.lock();
        let mut next = state.current(key)?.clone();
        if next.pointer("/metadata/deletionTimestamp").is_none() {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
            set_meta(&mut next, "deletionTimestamp", Value::String(now));
        }
        state.commit(key, next);
        Ok(())
    }
}

impl<K> InMemoryStore<K>
where
    K: Resource + Serialize + DeserializeOwned,
{
    /// Seed an object without recording a call
    pub fn insert(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let mut state = self.lock();
        let stored = Self::create_in(&mut state, &key, obj)?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Read an object without recording a call
    #[must_use]
    pub fn snapshot(&self, key: &ObjectKey) -> Option<K> {
        let state = self.lock();
        state
            .objects
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Apply an out-of-band edit to spec, metadata and status alike
    ///
    /// Stands in for other actors writing the object. Not recorded.
    pub fn edit<F>(&self, key: &ObjectKey, edit: F) -> Result<K, StoreError>
    where
        F: FnOnce(&mut K),
    {
        let mut state = self.lock();
        let current = state.current(key)?.clone();
        let mut obj: K = serde_json::from_value(current.clone())?;
        edit(&mut obj);
        let next = bump_generation(serde_json::to_value(&obj)?, &current);
        let stored = state.commit(key, next);
        Ok(serde_json::from_value(stored)?)
    }

    fn create_in(state: &mut State, key: &ObjectKey, obj: &K) -> Result<Value, StoreError> {
        if state.objects.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        let mut value = serde_json::to_value(obj)?;
        if let Value::Object(map) = &mut value {
            map.remove("status");
        }
        let uid = state.next_uid();
        set_meta(&mut value, "uid", Value::String(uid));
        set_meta(&mut value, "generation", Value::from(1));
        Ok(state.commit(key, value))
    }
}

#[async_trait]
impl<K> ObjectStore<K> for InMemoryStore<K>
where
    K: Resource + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<K, StoreError> {
        let mut state = self.lock();
        state.record(StoreOp::Get, key)?;
        let value = state.current(key)?.clone();
        Ok(serde_json::from_value(value)?)
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let mut state = self.lock();
        state.record(StoreOp::Create, &key)?;
        let stored = Self::create_in(&mut state, &key, obj)?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn patch(&self, obj: &K, base: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let patch = merge::object_patch(base, obj)?;
        let mut state = self.lock();
        state.record(StoreOp::Patch, &key)?;
        let stored = state.write_patch(&key, patch, WriteScope::Main)?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let replacement = serde_json::to_value(obj)?;
        let mut state = self.lock();
        state.record(StoreOp::Update, &key)?;

        let current = state.current(&key)?.clone();
        state.check_version(&key, &current, merge::resource_version(&replacement))?;

        let mut next = with_status_of(replacement, &current);
        for immutable in ["uid", "deletionTimestamp"] {
            if let Some(value) = current.pointer(&format!("/metadata/{immutable}")) {
                set_meta(&mut next, immutable, value.clone());
            }
        }
        let next = bump_generation(next, &current);
        let stored = state.commit(&key, next);
        Ok(serde_json::from_value(stored)?)
    }

    async fn patch_status(&self, obj: &K, base: &K) -> Result<K, StoreError> {
        let key = ObjectKey::for_resource(obj)?;
        let Some(patch) = merge::status_patch(base, obj)? else {
            return Ok(base.clone());
        };
        let mut state = self.lock();
        state.record(StoreOp::PatchStatus, &key)?;
        let stored = state.write_patch(&key, patch, WriteScope::Status)?;
        Ok(serde_json::from_value(stored)?)
    }
}
