//! The decision cycle.
//!
//! [`Enforcer`] owns the three injected interpreters and runs one full
//! reconciliation per call:
//!
//! 1. fetch the pipeline snapshot
//! 2. find bake candidates, then gather calendar states and resolve bake
//!    start times concurrently
//! 3. check the guarding alarms of every in-progress bake step
//! 4. evaluate transition gates and bake decisions
//! 5. log both decision summaries, then sequence the side effects
//! 6. publish pipeline metrics
//!
//! The enforcer keeps no state between cycles. Everything is re-derived from
//! the snapshot and the provenance tags written into disabled transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::bake::{
    StartTimeError, alarm_queries, decide_bake_actions, find_bake_candidates, resolve_start_times,
};
use crate::config::DeploymentSafetySettings;
use crate::effects::{
    CalendarInterpreter, MonitoringInterpreter, PipelineEffect, PipelineInterpreter,
    PipelineResponse,
};
use crate::error::RemoteError;
use crate::gate::calculate_transition_actions;
use crate::metrics::{PipelineMetrics, emit_metrics};
use crate::sequencer::{self, ActionOutcome};
use crate::signals::{gather_alarm_states, gather_calendar_states};
use crate::types::{
    ActionExecutionId, BakeAction, PipelineExecutionId, PipelineSnapshot, RequestId, SignalState,
    TransitionAction,
};

/// Errors that abort or fail a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to fetch pipeline state for {pipeline_name}: {source}")]
    FetchPipelineState {
        pipeline_name: String,
        #[source]
        source: RemoteError,
    },

    #[error("failed to list action executions for {pipeline_execution_id}: {source}")]
    ListActionExecutions {
        pipeline_execution_id: PipelineExecutionId,
        #[source]
        source: RemoteError,
    },

    /// In-progress bake actions have no matching execution record. No bake
    /// decision is made on inconsistent remote state.
    #[error("start times not found for {action_execution_ids:?} in {pipeline_execution_id}")]
    StartTimesNotFound {
        pipeline_execution_id: PipelineExecutionId,
        action_execution_ids: Vec<ActionExecutionId>,
    },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// All phases ran, but some items failed.
    #[error("{} of the cycle's actions failed", .failed.len())]
    ActionsFailed {
        failed: Vec<ActionOutcome>,
        report: Box<CycleReport>,
    },
}

impl From<StartTimeError> for CycleError {
    fn from(e: StartTimeError) -> Self {
        match e {
            StartTimeError::List {
                pipeline_execution_id,
                source,
            } => CycleError::ListActionExecutions {
                pipeline_execution_id,
                source,
            },
            StartTimeError::NotFound {
                pipeline_execution_id,
                action_execution_ids,
            } => CycleError::StartTimesNotFound {
                pipeline_execution_id,
                action_execution_ids,
            },
            StartTimeError::UnexpectedResponse(msg) => CycleError::UnexpectedResponse(msg),
        }
    }
}

/// Everything a cycle decided and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub transition_actions: Vec<TransitionAction>,
    pub bake_actions: Vec<BakeAction>,
    pub outcomes: Vec<ActionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PipelineMetrics>,
}

/// Runs decision cycles against injected service interpreters.
pub struct Enforcer<P, C, M> {
    pipeline: P,
    calendars: C,
    monitoring: M,
}

impl<P, C, M> Enforcer<P, C, M>
where
    P: PipelineInterpreter,
    C: CalendarInterpreter,
    M: MonitoringInterpreter,
{
    pub fn new(pipeline: P, calendars: C, monitoring: M) -> Self {
        Enforcer {
            pipeline,
            calendars,
            monitoring,
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn calendars(&self) -> &C {
        &self.calendars
    }

    pub fn monitoring(&self) -> &M {
        &self.monitoring
    }

    /// Runs one cycle at the current time.
    pub async fn run_cycle(
        &self,
        settings: &DeploymentSafetySettings,
        request_id: &RequestId,
    ) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(settings, request_id, Utc::now()).await
    }

    /// Runs one cycle, measuring bake progress against `now`.
    #[instrument(skip_all, fields(pipeline = %settings.pipeline_name, request_id = %request_id))]
    pub async fn run_cycle_at(
        &self,
        settings: &DeploymentSafetySettings,
        request_id: &RequestId,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let snapshot = self.fetch_snapshot(&settings.pipeline_name).await?;

        let candidates = find_bake_candidates(&snapshot, &settings.bake_steps);
        let calendar_names = settings.change_calendars.all_calendars();

        let (calendars, start_times) = futures::join!(
            gather_calendar_states(&self.calendars, &calendar_names),
            resolve_start_times(&self.pipeline, &candidates.in_progress),
        );
        let start_times = start_times?;

        let queries = alarm_queries(&candidates.in_progress, &settings.bake_steps, &start_times);
        let alarms = gather_alarm_states(&self.monitoring, &queries).await;

        let signals = SignalState { calendars, alarms };

        let transition_actions = calculate_transition_actions(
            &snapshot,
            &settings.change_calendars,
            &signals,
            request_id,
        );
        let mut bake_actions = candidates.settled;
        bake_actions.extend(decide_bake_actions(
            &candidates.in_progress,
            &settings.bake_steps,
            &start_times,
            &signals.alarms,
            now,
        ));

        log_summary("Transition actions", &transition_actions);
        log_summary("Bake actions", &bake_actions);

        let outcomes =
            sequencer::execute(&self.pipeline, &transition_actions, &bake_actions, request_id)
                .await;

        let metrics =
            emit_metrics(&self.monitoring, &settings.metrics_settings, &snapshot, now).await;

        let report = CycleReport {
            transition_actions,
            bake_actions,
            outcomes,
            metrics,
        };

        let failed: Vec<ActionOutcome> = report
            .outcomes
            .iter()
            .filter(|o| o.is_failed())
            .cloned()
            .collect();
        if !failed.is_empty() {
            warn!(failed = failed.len(), "Cycle completed with failed actions");
            return Err(CycleError::ActionsFailed {
                failed,
                report: Box::new(report),
            });
        }

        info!(outcomes = report.outcomes.len(), "Cycle complete");
        Ok(report)
    }

    async fn fetch_snapshot(&self, pipeline_name: &str) -> Result<PipelineSnapshot, CycleError> {
        let response = self
            .pipeline
            .interpret(PipelineEffect::GetPipelineState {
                pipeline_name: pipeline_name.to_string(),
            })
            .await
            .map_err(|source| CycleError::FetchPipelineState {
                pipeline_name: pipeline_name.to_string(),
                source,
            })?;

        match response {
            PipelineResponse::PipelineState(snapshot) => Ok(snapshot),
            other => Err(CycleError::UnexpectedResponse(format!(
                "get_pipeline_state returned {:?}",
                other
            ))),
        }
    }
}

/// Logs a decision list as one JSON document.
fn log_summary<T: Serialize>(label: &str, actions: &[T]) {
    match serde_json::to_string(actions) {
        Ok(json) => info!(summary = %json, "{}", label),
        Err(e) => warn!(error = %e, "Failed to serialize {}", label),
    }
}
