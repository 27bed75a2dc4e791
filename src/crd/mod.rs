//! # Custom Resource Definitions
//!
//! CRD types for the NginxSet controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `NginxSet` resource and its spec
//! - `status.rs` - Status and failure counter
//! - `condition.rs` - Condition records and the condition ledger

mod condition;
mod spec;
mod status;

pub use condition::{reason, Condition, ConditionStatus, ConditionType, Conditions};
pub use spec::{NginxSet, NginxSetSpec};
pub use status::{FailureCount, NginxSetStatus};
