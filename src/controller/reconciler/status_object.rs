//! # Status Objects
//!
//! Capabilities a reconciled kind exposes so the classifier and the status
//! helpers can work on it without knowing the concrete type.

use crate::constants::MAX_ATTEMPTS_EXCEEDED_PREFIX;
use crate::crd::{
    reason, Condition, ConditionStatus, ConditionType, Conditions, FailureCount, NginxSet,
};

/// Object carrying a condition ledger
pub trait ConditionObject {
    fn conditions(&self) -> Option<&Conditions>;

    fn conditions_mut(&mut self) -> &mut Conditions;

    fn find_condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions().and_then(|c| c.find(condition_type))
    }

    fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        self.conditions_mut()
            .upsert(condition_type, status, reason, message);
    }
}

/// Object carrying a saturating failure counter
pub trait FailureObject {
    fn failures(&self) -> FailureCount;

    fn failures_mut(&mut self) -> &mut FailureCount;

    fn add_failure(&mut self) {
        self.failures_mut().increment();
    }

    fn reset_failures(&mut self) {
        self.failures_mut().reset();
    }
}

/// Object whose status is owned by the controller
pub trait StatusObject: ConditionObject + FailureObject {
    /// `metadata.generation`
    fn generation(&self) -> i64;

    fn observed_generation(&self) -> i64;

    fn set_observed_generation(&mut self, generation: i64);

    /// Spec changed since the controller last looked at it
    fn has_generation_drift(&self) -> bool {
        self.observed_generation() != self.generation()
    }
}

impl ConditionObject for NginxSet {
    fn conditions(&self) -> Option<&Conditions> {
        self.status.as_ref().map(|s| &s.conditions)
    }

    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }
}

impl FailureObject for NginxSet {
    fn failures(&self) -> FailureCount {
        self.status.as_ref().map(|s| s.failures).unwrap_or_default()
    }

    fn failures_mut(&mut self) -> &mut FailureCount {
        &mut self.status.get_or_insert_with(Default::default).failures
    }
}

impl StatusObject for NginxSet {
    fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    fn observed_generation(&self) -> i64 {
        self.status
            .as_ref()
            .map(|s| s.observed_generation)
            .unwrap_or_default()
    }

    fn set_observed_generation(&mut self, generation: i64) {
        self.status
            .get_or_insert_with(Default::default)
            .observed_generation = generation;
    }
}

/// Record that a new generation is being rolled out and clear the failure budget
pub fn release_progressing<T: StatusObject>(obj: &mut T) {
    obj.set_condition(
        ConditionType::Ready,
        ConditionStatus::Unknown,
        reason::PROGRESSING,
        "Reconciliation in progress",
    );
    obj.reset_failures();
}

/// Record a failed pass and spend one unit of the failure budget
pub fn release_not_ready<T: StatusObject>(obj: &mut T, message: &str) {
    obj.set_condition(
        ConditionType::Ready,
        ConditionStatus::False,
        reason::FAILED,
        message,
    );
    obj.add_failure();
}

/// Record the terminal condition once the failure budget is exhausted
///
/// The previous Ready message is embedded once; an already terminal message
/// is kept as is. Returns the recorded message.
pub fn release_aborted<T: StatusObject>(obj: &mut T) -> String {
    let prior = obj
        .find_condition(ConditionType::Ready)
        .map(|c| c.message.clone())
        .unwrap_or_default();
    let message = if prior.starts_with(MAX_ATTEMPTS_EXCEEDED_PREFIX) {
        prior
    } else {
        format!("{MAX_ATTEMPTS_EXCEEDED_PREFIX}({prior})")
    };
    obj.set_condition(
        ConditionType::Ready,
        ConditionStatus::False,
        reason::FAILED,
        &message,
    );
    message
}

pub fn set_ready<T: StatusObject>(obj: &mut T) {
    obj.set_condition(
        ConditionType::Ready,
        ConditionStatus::True,
        reason::SUCCEEDED,
        "Reconcile Success",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_FAILURES;
    use crate::crd::NginxSetSpec;

    fn nginxset(generation: i64) -> NginxSet {
        let mut obj = NginxSet::new("web", NginxSetSpec { replicas: 1 });
        obj.metadata.generation = Some(generation);
        obj
    }

    #[test]
    fn test_missing_status_reads_as_defaults() {
        let obj = nginxset(1);
        assert!(obj.find_condition(ConditionType::Ready).is_none());
        assert_eq!(obj.failures().get(), 0);
        assert_eq!(obj.observed_generation(), 0);
        assert!(obj.has_generation_drift());
    }

    #[test]
    fn test_release_progressing_resets_failures() {
        let mut obj = nginxset(2);
        for _ in 0..3 {
            obj.add_failure();
        }
        release_progressing(&mut obj);

        let ready = obj.find_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.reason, reason::PROGRESSING);
        assert_eq!(obj.failures().get(), 0);
    }

    #[test]
    fn test_release_not_ready_counts_failure() {
        let mut obj = nginxset(1);
        release_not_ready(&mut obj, "deployments.apps \"web\" is forbidden");

        let ready = obj.find_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, reason::FAILED);
        assert_eq!(ready.message, "deployments.apps \"web\" is forbidden");
        assert_eq!(obj.failures().get(), 1);
    }

    #[test]
    fn test_release_aborted_wraps_prior_message_once() {
        let mut obj = nginxset(1);
        for _ in 0..MAX_FAILURES {
            release_not_ready(&mut obj, "quota exceeded");
        }

        let first = release_aborted(&mut obj);
        assert_eq!(
            first,
            "exceeded the maximum number of release attempts(quota exceeded)"
        );
        let second = release_aborted(&mut obj);
        assert_eq!(second, first);
        assert_eq!(obj.failures().get(), MAX_FAILURES);
    }

    #[test]
    fn test_set_ready() {
        let mut obj = nginxset(1);
        set_ready(&mut obj);
        let ready = obj.find_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason, reason::SUCCEEDED);
        assert_eq!(ready.message, "Reconcile Success");
    }
}
