//! # Conditions
//!
//! Condition records and the ledger that keeps at most one record per type.
//!
//! Timestamp rules:
//! - `lastTransitionTime` moves only when `status` changes
//! - `lastUpdateTime` moves whenever status, reason or message changes
//! - an upsert that changes nothing leaves both timestamps alone

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition reasons
pub mod reason {
    pub const INIT: &str = "Init";
    pub const SUCCEEDED: &str = "Succeeded";
    pub const FAILED: &str = "Failed";
    pub const GET_LAST_RELEASE_FAILED: &str = "GetLastReleaseFailed";
    pub const PROGRESSING: &str = "Progressing";
}

/// Condition types understood by the controller
///
/// Types written by other actors are kept verbatim in [`ConditionType::Other`]
/// so reading and re-persisting the status never drops or rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    /// The controller considers the resource ready
    Ready,
    Config,
    Parsed,
    Revision,
    Workflow,
    Task,
    Render,
    Validated,
    /// Last recorded error
    Error,
    /// Any type outside the vocabulary above
    Other(String),
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ConditionType::Ready => "Ready",
            ConditionType::Config => "Config",
            ConditionType::Parsed => "Parsed",
            ConditionType::Revision => "Revision",
            ConditionType::Workflow => "Workflow",
            ConditionType::Task => "Task",
            ConditionType::Render => "Render",
            ConditionType::Validated => "Validated",
            ConditionType::Error => "Error",
            ConditionType::Other(other) => other,
        }
    }
}

impl From<String> for ConditionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Ready" => ConditionType::Ready,
            "Config" => ConditionType::Config,
            "Parsed" => ConditionType::Parsed,
            "Revision" => ConditionType::Revision,
            "Workflow" => ConditionType::Workflow,
            "Task" => ConditionType::Task,
            "Render" => ConditionType::Render,
            "Validated" => ConditionType::Validated,
            "Error" => ConditionType::Error,
            _ => ConditionType::Other(value),
        }
    }
}

impl From<ConditionType> for String {
    fn from(value: ConditionType) -> Self {
        match value {
            ConditionType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents one observed aspect of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[schemars(with = "String")]
    pub r#type: ConditionType,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Programmatic identifier for the last change
    #[serde(default)]
    pub reason: String,
    /// Human readable detail, may be empty
    #[serde(default)]
    pub message: String,
    /// Last time any field of the condition changed
    pub last_update_time: DateTime<Utc>,
    /// Last time the status changed
    pub last_transition_time: DateTime<Utc>,
}

/// Ordered set of conditions, unique by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    /// Insert or update the condition of the given type, stamped with the current time
    pub fn upsert(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        self.upsert_at(condition_type, status, reason, message, Utc::now());
    }

    /// Insert or update the condition of the given type, stamped with `now`
    pub fn upsert_at(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) {
        let Some(idx) = self.0.iter().position(|c| c.r#type == condition_type) else {
            self.0.push(Condition {
                r#type: condition_type,
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_update_time: now,
                last_transition_time: now,
            });
            return;
        };

        let current = &mut self.0[idx];
        if current.status == status && current.reason == reason && current.message == message {
            return;
        }

        current.last_update_time = now;
        if current.status != status {
            current.last_transition_time = now;
        }
        current.status = status;
        reason.clone_into(&mut current.reason);
        message.clone_into(&mut current.message);
    }

    #[must_use]
    pub fn find(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.r#type == condition_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_upsert_appends_with_both_timestamps() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(
            ConditionType::Ready,
            ConditionStatus::Unknown,
            reason::PROGRESSING,
            "Reconciliation in progress",
            t0(),
        );

        let ready = conditions.find(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.last_update_time, t0());
        assert_eq!(ready.last_transition_time, t0());
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_identical_upsert_is_a_no_op() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::True, reason::SUCCEEDED, "ok", t0());
        conditions.upsert_at(
            ConditionType::Ready,
            ConditionStatus::True,
            reason::SUCCEEDED,
            "ok",
            t0() + Duration::minutes(5),
        );

        let ready = conditions.find(ConditionType::Ready).unwrap();
        assert_eq!(ready.last_update_time, t0());
        assert_eq!(ready.last_transition_time, t0());
    }

    #[test]
    fn test_reason_change_moves_update_time_only() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::False, reason::FAILED, "boom", t0());
        let later = t0() + Duration::seconds(30);
        conditions.upsert_at(
            ConditionType::Ready,
            ConditionStatus::False,
            reason::GET_LAST_RELEASE_FAILED,
            "boom",
            later,
        );

        let ready = conditions.find(ConditionType::Ready).unwrap();
        assert_eq!(ready.reason, reason::GET_LAST_RELEASE_FAILED);
        assert_eq!(ready.last_update_time, later);
        assert_eq!(ready.last_transition_time, t0());
    }

    #[test]
    fn test_message_change_moves_update_time_only() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::False, reason::FAILED, "first", t0());
        let later = t0() + Duration::seconds(1);
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::False, reason::FAILED, "second", later);

        let ready = conditions.find(ConditionType::Ready).unwrap();
        assert_eq!(ready.message, "second");
        assert_eq!(ready.last_update_time, later);
        assert_eq!(ready.last_transition_time, t0());
    }

    #[test]
    fn test_status_change_moves_both_timestamps() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::False, reason::FAILED, "boom", t0());
        let later = t0() + Duration::minutes(1);
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::True, reason::SUCCEEDED, "ok", later);

        let ready = conditions.find(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.last_update_time, later);
        assert_eq!(ready.last_transition_time, later);
    }

    #[test]
    fn test_types_are_never_duplicated() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::False, reason::FAILED, "a", t0());
        conditions.upsert_at(ConditionType::Parsed, ConditionStatus::True, reason::SUCCEEDED, "", t0());
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::True, reason::SUCCEEDED, "b", t0());

        assert_eq!(conditions.len(), 2);
        let types: Vec<_> = conditions.iter().map(|c| c.r#type.clone()).collect();
        assert_eq!(types, vec![ConditionType::Ready, ConditionType::Parsed]);
    }

    #[test]
    fn test_find_missing_type() {
        let conditions = Conditions::default();
        assert!(conditions.find(ConditionType::Ready).is_none());
        assert!(conditions.is_empty());
    }

    #[test]
    fn test_serialized_layout() {
        let mut conditions = Conditions::default();
        conditions.upsert_at(ConditionType::Ready, ConditionStatus::True, reason::SUCCEEDED, "ok", t0());
        let value = serde_json::to_value(&conditions).unwrap();
        let first = &value[0];
        assert_eq!(first["type"], "Ready");
        assert_eq!(first["status"], "True");
        assert_eq!(first["reason"], "Succeeded");
        assert!(first["lastUpdateTime"].is_string());
        assert!(first["lastTransitionTime"].is_string());
    }

    #[test]
    fn test_foreign_condition_types_survive_a_round_trip() {
        let raw = serde_json::json!([{
            "type": "Available",
            "status": "True",
            "reason": "MinimumReplicasAvailable",
            "message": "",
            "lastUpdateTime": "2024-05-01T12:00:00Z",
            "lastTransitionTime": "2024-05-01T12:00:00Z"
        }]);
        let mut conditions: Conditions = serde_json::from_value(raw.clone()).unwrap();
        let available = ConditionType::Other("Available".to_string());
        assert!(conditions.find(available.clone()).is_some());
        assert_eq!(serde_json::to_value(&conditions).unwrap(), raw);

        conditions.upsert_at(ConditionType::Ready, ConditionStatus::True, reason::SUCCEEDED, "", t0());
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions.find(available).unwrap().reason, "MinimumReplicasAvailable");
    }
}
