//! # Release State
//!
//! Decides what a reconcile pass should do from the Ready condition and the
//! failure counter.
//!
//! | Ready            | failures | state                   |
//! |------------------|----------|-------------------------|
//! | absent           | any      | `NeedsInstallOrUpgrade` |
//! | True             | any      | `Unchanged`             |
//! | False or Unknown | < 5      | `NeedsInstallOrUpgrade` |
//! | False or Unknown | >= 5     | `Abort`                 |

use std::fmt;

use crate::controller::reconciler::status_object::StatusObject;
use crate::crd::{ConditionStatus, ConditionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    /// Create the Deployment or force its replica count
    NeedsInstallOrUpgrade,
    /// Already ready; only correct replica drift
    Unchanged,
    /// Failure budget spent; record a terminal condition and stop
    Abort,
}

impl ReleaseState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseState::NeedsInstallOrUpgrade => "needs-install-or-upgrade",
            ReleaseState::Unchanged => "unchanged",
            ReleaseState::Abort => "abort",
        }
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn classify<T: StatusObject>(obj: &T) -> ReleaseState {
    match obj.find_condition(ConditionType::Ready) {
        None => ReleaseState::NeedsInstallOrUpgrade,
        Some(ready) if ready.status == ConditionStatus::True => ReleaseState::Unchanged,
        Some(_) if obj.failures().exhausted() => ReleaseState::Abort,
        Some(_) => ReleaseState::NeedsInstallOrUpgrade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::status_object::{ConditionObject, FailureObject};
    use crate::crd::{reason, FailureCount, NginxSet, NginxSetSpec};

    fn nginxset(ready: Option<ConditionStatus>, failures: i64) -> NginxSet {
        let mut obj = NginxSet::new("web", NginxSetSpec { replicas: 1 });
        if let Some(status) = ready {
            obj.set_condition(ConditionType::Ready, status, reason::INIT, "");
        }
        *obj.failures_mut() = FailureCount::new(failures);
        obj
    }

    #[test]
    fn test_absent_ready_installs_regardless_of_failures() {
        assert_eq!(classify(&nginxset(None, 0)), ReleaseState::NeedsInstallOrUpgrade);
        assert_eq!(classify(&nginxset(None, 5)), ReleaseState::NeedsInstallOrUpgrade);
    }

    #[test]
    fn test_ready_true_is_unchanged() {
        assert_eq!(
            classify(&nginxset(Some(ConditionStatus::True), 0)),
            ReleaseState::Unchanged
        );
        assert_eq!(
            classify(&nginxset(Some(ConditionStatus::True), 5)),
            ReleaseState::Unchanged
        );
    }

    #[test]
    fn test_abort_iff_budget_spent_and_not_ready() {
        for status in [ConditionStatus::False, ConditionStatus::Unknown] {
            for failures in 0..=5 {
                let expected = if failures >= 5 {
                    ReleaseState::Abort
                } else {
                    ReleaseState::NeedsInstallOrUpgrade
                };
                assert_eq!(
                    classify(&nginxset(Some(status), failures)),
                    expected,
                    "status={status} failures={failures}"
                );
            }
        }
    }
}
