//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use nginxset_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (NginxSet, NginxSetStatus, Condition, etc.)
//! - Reconciler types and status-object traits
//! - Store trait, keys and errors
//! - Config types (ControllerConfig, ServerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    classify, reconcile, ConditionObject, FailureObject, Reconciler, ReconcilerError,
    ReleaseState, StatusObject,
};

// Store surface
pub use crate::store::{InMemoryStore, KubeStore, ObjectKey, ObjectStore, StoreError, StoreOp};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};
