//! # NginxSet Status
//!
//! Status types for tracking reconciliation state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_FAILURES;
use crate::crd::Conditions;

/// Status of the NginxSet resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxSetStatus {
    /// Generation last processed by the controller
    #[serde(default)]
    pub observed_generation: i64,
    /// Condition ledger, at most one entry per condition type
    #[serde(default)]
    pub conditions: Conditions,
    /// Consecutive failed install attempts, capped at the failure budget
    #[serde(default)]
    pub failures: FailureCount,
}

/// Saturating failure counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct FailureCount(i64);

impl FailureCount {
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, MAX_FAILURES))
    }

    /// Add one failure; stays at the cap once reached
    pub fn increment(&mut self) {
        if self.0 < MAX_FAILURES {
            self.0 += 1;
        }
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.0 >= MAX_FAILURES
    }
}
