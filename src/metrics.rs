//! Per-cycle pipeline health metrics.
//!
//! Derived from the same snapshot the cycle decided on and published after
//! sequencing. Publication is best effort: a failure is logged and never
//! fails the cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::MetricsSettings;
use crate::effects::{MetricDatum, MetricUnit, MonitoringEffect, MonitoringInterpreter};
use crate::types::{ExecutionStatus, PipelineSnapshot};

pub const FAILED_STAGES: &str = "FailedStages";
pub const MAX_ACTION_EXECUTION_LATENCY: &str = "MaxActionExecutionLatency";
pub const PIPELINE_NAME_DIMENSION: &str = "PipelineName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    /// Stages whose latest execution failed.
    pub failed_stages: u64,
    /// Longest time any action has been in progress, in milliseconds.
    pub max_action_execution_latency_ms: u64,
}

impl PipelineMetrics {
    pub fn compute(snapshot: &PipelineSnapshot, now: DateTime<Utc>) -> Self {
        let failed_stages = snapshot
            .stages
            .iter()
            .filter(|s| {
                s.latest_execution
                    .as_ref()
                    .is_some_and(|e| e.status == ExecutionStatus::Failed)
            })
            .count() as u64;

        let max_action_execution_latency_ms = snapshot
            .stages
            .iter()
            .flat_map(|s| &s.actions)
            .filter_map(|a| a.latest_execution.as_ref())
            .filter(|e| e.status.is_in_progress())
            .filter_map(|e| e.last_status_change)
            .map(|changed| (now - changed).num_milliseconds().max(0) as u64)
            .max()
            .unwrap_or(0);

        PipelineMetrics {
            failed_stages,
            max_action_execution_latency_ms,
        }
    }

    /// Builds the `PutMetricData` effect for these metrics.
    pub fn to_effect(&self, namespace: &str, pipeline_name: &str) -> MonitoringEffect {
        MonitoringEffect::PutMetricData {
            namespace: namespace.to_string(),
            dimensions: vec![(PIPELINE_NAME_DIMENSION.to_string(), pipeline_name.to_string())],
            data: vec![
                MetricDatum {
                    metric_name: FAILED_STAGES.to_string(),
                    value: self.failed_stages,
                    unit: MetricUnit::Count,
                },
                MetricDatum {
                    metric_name: MAX_ACTION_EXECUTION_LATENCY.to_string(),
                    value: self.max_action_execution_latency_ms,
                    unit: MetricUnit::Milliseconds,
                },
            ],
        }
    }
}

/// Computes and publishes metrics if enabled. Returns what was computed.
pub async fn emit_metrics<M>(
    monitoring: &M,
    settings: &MetricsSettings,
    snapshot: &PipelineSnapshot,
    now: DateTime<Utc>,
) -> Option<PipelineMetrics>
where
    M: MonitoringInterpreter,
{
    if !settings.enabled {
        return None;
    }

    let metrics = PipelineMetrics::compute(snapshot, now);
    let effect = metrics.to_effect(settings.namespace(), &snapshot.pipeline_name);

    match monitoring.interpret(effect).await {
        Ok(_) => debug!(?metrics, "Published pipeline metrics"),
        Err(e) => warn!(error = %e, "Failed to publish pipeline metrics"),
    }
    Some(metrics)
}
