//! # Merge Patches
//!
//! JSON merge patch (RFC 7386) construction and application.
//!
//! Patches are computed as the difference between a `base` copy and the
//! object to persist. Objects recurse key by key; arrays and scalars are
//! replaced wholesale; keys absent from the target become `null`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Compute the merge patch that turns `base` into `target`
#[must_use]
pub fn diff(base: &Value, target: &Value) -> Value {
    match (base, target) {
        (Value::Object(base_map), Value::Object(target_map)) => {
            let mut patch = Map::new();
            for key in base_map.keys() {
                if !target_map.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            for (key, target_value) in target_map {
                match base_map.get(key) {
                    Some(base_value) if base_value == target_value => {}
                    Some(base_value @ Value::Object(_)) if target_value.is_object() => {
                        let nested = diff(base_value, target_value);
                        if nested.as_object().is_none_or(|m| !m.is_empty()) {
                            patch.insert(key.clone(), nested);
                        }
                    }
                    _ => {
                        patch.insert(key.clone(), target_value.clone());
                    }
                }
            }
            Value::Object(patch)
        }
        _ => target.clone(),
    }
}

/// Apply a merge patch to `target` in place
pub fn apply(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                apply(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Patch for everything but `status`, gated on `base`'s resource version
pub fn object_patch<K: Serialize>(base: &K, obj: &K) -> Result<Value, serde_json::Error> {
    let mut base = serde_json::to_value(base)?;
    let mut obj = serde_json::to_value(obj)?;
    strip(&mut base, "status");
    strip(&mut obj, "status");

    let mut patch = diff(&base, &obj);
    gate_on_resource_version(&mut patch, &base);
    Ok(patch)
}

/// Patch for the `status` subtree only, gated on `base`'s resource version
///
/// Returns `None` when the status is unchanged.
pub fn status_patch<K: Serialize>(base: &K, obj: &K) -> Result<Option<Value>, serde_json::Error> {
    let base = serde_json::to_value(base)?;
    let obj = serde_json::to_value(obj)?;
    let base_status = base.get("status").cloned().unwrap_or(Value::Null);
    let obj_status = obj.get("status").cloned().unwrap_or(Value::Null);
    if base_status == obj_status {
        return Ok(None);
    }

    let status = if base_status.is_object() {
        diff(&base_status, &obj_status)
    } else {
        obj_status
    };
    let mut patch = serde_json::json!({ "status": status });
    gate_on_resource_version(&mut patch, &base);
    Ok(Some(patch))
}

/// Resource version recorded on a serialized object, if any
#[must_use]
pub fn resource_version(value: &Value) -> Option<&str> {
    value.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

fn strip(value: &mut Value, key: &str) {
    if let Value::Object(map) = value {
        map.remove(key);
    }
}

fn gate_on_resource_version(patch: &mut Value, base: &Value) {
    let Some(version) = resource_version(base) else {
        return;
    };
    let Value::Object(patch_map) = patch else {
        return;
    };
    let metadata = patch_map
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(meta) = metadata {
        meta.insert(
            "resourceVersion".to_string(),
            Value::String(version.to_string()),
        );
    }
}
