//! Enforcer settings and schedule configuration.
//!
//! `DeploymentSafetySettings` is the structured payload delivered by the
//! scheduler on every tick. It is camelCase JSON:
//!
//! ```text
//! {
//!   "pipelineName": "Pipeline",
//!   "changeCalendars": { "Prod": ["FreezeCalendar"] },
//!   "bakeSteps": {
//!     "BakeProd": {
//!       "bakeTimeMillis": 7200000,
//!       "alarmSettings": [{ "alarmName": "Errors", "region": "us-east-1" }]
//!     }
//!   },
//!   "metricsSettings": { "enabled": true }
//! }
//! ```
//!
//! `ScheduleConfig` controls the runner loop and comes from the environment.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::types::{AlarmGroup, MissingAlarmPolicy};

/// Default CloudWatch-style namespace for emitted metrics.
pub const DEFAULT_METRIC_NAMESPACE: &str = "DeploymentSafetyEnforcer";

/// Default interval between cycles (10 minutes).
const DEFAULT_INTERVAL_MINS: u64 = 10;

/// Default hard timeout for a single cycle (1 minute).
const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Change calendars gating each stage, in configuration order.
///
/// Evaluation emits one transition action per entry in this order, so the
/// payload's key order is preserved rather than collected into a hash map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCalendars(Vec<(String, Vec<String>)>);

impl StageCalendars {
    pub fn new() -> Self {
        StageCalendars(Vec::new())
    }

    /// Adds or replaces the calendars for a stage, keeping its original position.
    pub fn insert(&mut self, stage_name: impl Into<String>, calendars: Vec<String>) {
        let stage_name = stage_name.into();
        match self.0.iter_mut().find(|(name, _)| *name == stage_name) {
            Some((_, existing)) => *existing = calendars,
            None => self.0.push((stage_name, calendars)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(stage, calendars)| (stage.as_str(), calendars.as_slice()))
    }

    pub fn get(&self, stage_name: &str) -> Option<&[String]> {
        self.iter()
            .find(|(name, _)| *name == stage_name)
            .map(|(_, calendars)| calendars)
    }

    /// Every calendar referenced by any stage, deduplicated, in first-seen order.
    pub fn all_calendars(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.0
            .iter()
            .flat_map(|(_, calendars)| calendars.iter())
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for StageCalendars {
    fn from_iter<I: IntoIterator<Item = (S, Vec<String>)>>(iter: I) -> Self {
        let mut stages = StageCalendars::new();
        for (stage, calendars) in iter {
            stages.insert(stage, calendars);
        }
        stages
    }
}

impl Serialize for StageCalendars {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (stage, calendars) in &self.0 {
            map.serialize_entry(stage, calendars)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StageCalendars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StageCalendarsVisitor;

        impl<'de> Visitor<'de> for StageCalendarsVisitor {
            type Value = StageCalendars;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of stage name to calendar names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((stage, calendars)) = access.next_entry::<String, Vec<String>>()? {
                    entries.push((stage, calendars));
                }
                Ok(StageCalendars(entries))
            }
        }

        deserializer.deserialize_map(StageCalendarsVisitor)
    }
}

/// A guarding alarm for a bake step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSettings {
    pub alarm_name: String,
    pub region: String,
    /// Role to assume to describe the alarm (cross-account alarms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assume_role_arn: Option<String>,
    #[serde(default)]
    pub treat_missing_alarm: MissingAlarmPolicy,
}

impl AlarmSettings {
    pub fn group(&self) -> AlarmGroup {
        AlarmGroup {
            region: self.region.clone(),
            assume_role: self.assume_role_arn.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BakeStepSettings {
    /// How long to wait before approving the step.
    pub bake_time_millis: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarm_settings: Vec<AlarmSettings>,
}

impl BakeStepSettings {
    pub fn bake_time(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.bake_time_millis).unwrap_or(i64::MAX))
    }

    pub fn is_guarded(&self) -> bool {
        !self.alarm_settings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        MetricsSettings {
            enabled: true,
            namespace: None,
        }
    }
}

impl MetricsSettings {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_METRIC_NAMESPACE)
    }
}

fn default_true() -> bool {
    true
}

/// Per-invocation settings for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSafetySettings {
    pub pipeline_name: String,
    #[serde(default)]
    pub change_calendars: StageCalendars,
    /// Bake steps indexed by manual-approval action name.
    #[serde(default)]
    pub bake_steps: BTreeMap<String, BakeStepSettings>,
    #[serde(default)]
    pub metrics_settings: MetricsSettings,
}

impl DeploymentSafetySettings {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        DeploymentSafetySettings {
            pipeline_name: pipeline_name.into(),
            change_calendars: StageCalendars::new(),
            bake_steps: BTreeMap::new(),
            metrics_settings: MetricsSettings::default(),
        }
    }

    /// Parses and validates a settings payload.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: DeploymentSafetySettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline_name.trim().is_empty() {
            return Err(ConfigError::Invalid("pipelineName must not be empty".into()));
        }

        let mut stages = HashSet::new();
        for (stage, calendars) in self.change_calendars.iter() {
            if stage.is_empty() {
                return Err(ConfigError::Invalid(
                    "changeCalendars contains an empty stage name".into(),
                ));
            }
            if !stages.insert(stage) {
                return Err(ConfigError::Invalid(format!(
                    "stage {} is configured more than once",
                    stage
                )));
            }
            if calendars.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "stage {} has an empty calendar name",
                    stage
                )));
            }
        }

        for (action, step) in &self.bake_steps {
            for alarm in &step.alarm_settings {
                if alarm.alarm_name.trim().is_empty() || alarm.region.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "bake step {} has an alarm without name or region",
                        action
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Configuration for the scheduled runner.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Interval between cycles.
    ///
    /// Default: 10 minutes. Configure via `ENFORCER_INTERVAL_MINS`.
    pub interval: Duration,

    /// Hard timeout for a single cycle.
    ///
    /// Default: 60 seconds. Configure via `ENFORCER_CYCLE_TIMEOUT_SECS`.
    pub cycle_timeout: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleConfig {
    pub fn new() -> Self {
        ScheduleConfig {
            interval: Duration::from_secs(DEFAULT_INTERVAL_MINS * 60),
            cycle_timeout: Duration::from_secs(DEFAULT_CYCLE_TIMEOUT_SECS),
        }
    }

    /// Reads overrides from the environment; unset or unparseable values use defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let interval_mins = lookup("ENFORCER_INTERVAL_MINS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&m| m > 0)
            .unwrap_or(DEFAULT_INTERVAL_MINS);
        let timeout_secs = lookup("ENFORCER_CYCLE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_CYCLE_TIMEOUT_SECS);

        ScheduleConfig {
            interval: Duration::from_secs(interval_mins * 60),
            cycle_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
