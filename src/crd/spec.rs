//! # NginxSet Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// NginxSet Custom Resource Definition
///
/// Declares a desired number of nginx replicas. The controller owns a
/// Deployment of the same name and namespace that runs them.
///
/// # Example
///
/// ```yaml
/// apiVersion: api.morpheusph.io/v1beta1
/// kind: NginxSet
/// metadata:
///   name: web
///   namespace: default
/// spec:
///   replicas: 3
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "NginxSet",
    group = "api.morpheusph.io",
    version = "v1beta1",
    namespaced,
    status = "crate::crd::NginxSetStatus",
    shortname = "ngs",
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Failures", "type":"integer", "jsonPath":".status.failures"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NginxSetSpec {
    /// Desired number of nginx pods
    #[serde(default)]
    pub replicas: i32,
}
