//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from Rust type definitions.
//!
//! This binary uses the `kube` crate's `CustomResourceExt` trait to generate
//! the CRD YAML for the `NginxSet` resource.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/nginxset.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! The generated CRD includes:
//! - OpenAPI schema validation
//! - Status subresource
//! - Replicas, Ready and Failures printer columns

use kube::core::CustomResourceExt;
use nginxset_controller::crd::NginxSet;

fn main() -> anyhow::Result<()> {
    let crd = NginxSet::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
