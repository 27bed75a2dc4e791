//! # Reconciler
//!
//! Core reconciliation logic for `NginxSet` resources.
//!
//! The reconciler:
//! - Registers a finalizer on every `NginxSet`
//! - Keeps one nginx `Deployment` per `NginxSet` at the declared replica count
//! - Records progress in a Ready condition and a bounded failure counter
//! - Releases the finalizer when the `NginxSet` is deleted
//!
//! ## Module Structure
//!
//! - `reconcile.rs` - One pass, start to finish
//! - `classify.rs` - Release state decision
//! - `status_object.rs` - Condition and failure-counter capabilities, Ready helpers
//! - `status.rs` - Status subresource persistence
//! - `workload.rs` - Deployment template and sync
//! - `finalizer.rs` - Finalizer lifecycle
//! - `types.rs` - Context and error types

pub mod classify;
pub mod finalizer;
pub mod reconcile;
pub mod status;
pub mod status_object;
pub mod types;
pub mod workload;

// Re-export public API
pub use classify::{classify, ReleaseState};
pub use reconcile::{reconcile, reconcile_object};
pub use status_object::{ConditionObject, FailureObject, StatusObject};
pub use types::{Reconciler, ReconcilerError};
pub use workload::{build_deployment, WorkloadAction};
