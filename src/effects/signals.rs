//! Change-calendar and monitoring effect types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlarmGroup, CalendarState};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalendarEffect {
    /// Query the current state of one calendar (name or ARN).
    GetCalendarState { calendar: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CalendarResponse {
    State(CalendarState),
}

/// Raw alarm state as reported by the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStateValue {
    Ok,
    Alarm,
    InsufficientData,
}

/// One alarm returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmDescription {
    pub alarm_name: String,
    pub state_value: AlarmStateValue,
    /// When the alarm last changed state.
    pub state_updated: Option<DateTime<Utc>>,
}

/// Unit of an emitted metric datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnit {
    Count,
    Milliseconds,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricDatum {
    pub metric_name: String,
    pub value: u64,
    pub unit: MetricUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitoringEffect {
    /// Describe a batch of alarms, metric and composite alike.
    ///
    /// All alarms in the batch share one region/assumed-role pair, so the
    /// interpreter can serve the whole batch from one session.
    DescribeAlarms {
        group: AlarmGroup,
        alarm_names: Vec<String>,
    },

    /// Publish metric data points.
    PutMetricData {
        namespace: String,
        dimensions: Vec<(String, String)>,
        data: Vec<MetricDatum>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MonitoringResponse {
    /// Response to `DescribeAlarms`. Alarms that do not exist are simply absent.
    Alarms(Vec<AlarmDescription>),

    /// Response to `PutMetricData`.
    MetricsPut,
}
