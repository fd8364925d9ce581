//! External signal states consulted by a decision cycle.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ActionExecutionId;

/// State of a change calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarState {
    /// Changes are allowed.
    Open,
    /// A freeze/maintenance window is active; promotions must be blocked.
    Closed,
}

/// Health of a guarding alarm relative to a bake start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    /// Currently OK and has not changed state since the cutoff.
    Ok,
    /// Not OK now, or transitioned after the cutoff.
    InAlarm,
    /// Not returned by the describe call (or the describe call failed).
    Missing,
}

impl AlarmState {
    /// Returns true if this state should fail the guarded bake step.
    pub fn is_failure(&self, policy: MissingAlarmPolicy) -> bool {
        match self {
            AlarmState::Ok => false,
            AlarmState::InAlarm => true,
            AlarmState::Missing => policy == MissingAlarmPolicy::Reject,
        }
    }
}

/// What to do when a guarding alarm cannot be found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingAlarmPolicy {
    /// Treat a missing alarm as healthy (e.g. the alarm is not created yet).
    Ignore,
    /// Treat a missing alarm as a failure.
    #[default]
    Reject,
}

/// The `(region, assumed role)` pair alarm describes are batched by.
///
/// One remote session is used per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlarmGroup {
    pub region: String,
    pub assume_role: Option<String>,
}

impl fmt::Display for AlarmGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assume_role {
            Some(role) => write!(f, "{} as {}", self.region, role),
            None => write!(f, "{}", self.region),
        }
    }
}

/// One guarding alarm to check for one in-progress bake action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmQuery {
    /// The bake action execution this alarm guards.
    pub action_execution_id: ActionExecutionId,
    pub alarm_name: String,
    pub group: AlarmGroup,
    pub treat_missing: MissingAlarmPolicy,
    /// State changes strictly after this instant fail the step.
    pub cutoff: DateTime<Utc>,
}

impl AlarmQuery {
    pub fn key(&self) -> AlarmKey {
        AlarmKey {
            action_execution_id: self.action_execution_id.clone(),
            group: self.group.clone(),
            alarm_name: self.alarm_name.clone(),
        }
    }
}

/// Identifies an alarm observation within a cycle.
///
/// The action execution id is part of the key because the same alarm may
/// guard several bake steps with different cutoffs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlarmKey {
    pub action_execution_id: ActionExecutionId,
    pub group: AlarmGroup,
    pub alarm_name: String,
}

/// All signal states gathered for one decision cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalState {
    pub calendars: HashMap<String, CalendarState>,
    pub alarms: HashMap<AlarmKey, AlarmState>,
}

impl SignalState {
    pub fn calendar(&self, name: &str) -> Option<CalendarState> {
        self.calendars.get(name).copied()
    }

    pub fn is_closed(&self, name: &str) -> bool {
        self.calendar(name) == Some(CalendarState::Closed)
    }

    pub fn alarm(&self, key: &AlarmKey) -> Option<AlarmState> {
        self.alarms.get(key).copied()
    }
}
