//! Shared test utilities: snapshot builders, fixtures and recording mock
//! interpreters.
//!
//! Every mock records the effects it receives into an [`EffectLog`]. Mocks
//! built with [`MockPipeline::sharing`] (and friends) append to one log, so a
//! test can assert the relative order of effects across services.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::config::{AlarmSettings, BakeStepSettings, StageCalendars};
use crate::effects::{
    AlarmDescription, AlarmStateValue, CalendarEffect, CalendarInterpreter, CalendarResponse,
    Effect, MonitoringEffect, MonitoringInterpreter, MonitoringResponse, PipelineEffect,
    PipelineInterpreter, PipelineResponse,
};
use crate::error::RemoteError;
use crate::types::{
    ActionExecution, ActionExecutionDetail, ActionExecutionId, ActionState, AlarmGroup,
    ApprovalProps, ApprovalToken, CalendarState, ExecutionStatus, PipelineExecutionId,
    PipelineSnapshot, SignalState, StageExecution, StageState, TransitionState,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// A fixed instant offset by `secs` (which may be negative).
pub fn t(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub fn calendars(entries: Vec<(&str, Vec<&str>)>) -> StageCalendars {
    entries
        .into_iter()
        .map(|(stage, cals)| (stage, cals.into_iter().map(str::to_string).collect()))
        .collect()
}

pub fn signals_with(states: &[(&str, CalendarState)]) -> SignalState {
    SignalState {
        calendars: states
            .iter()
            .map(|(name, state)| (name.to_string(), *state))
            .collect(),
        ..SignalState::default()
    }
}

pub fn bake_step(bake_time_millis: u64, alarm_settings: Vec<AlarmSettings>) -> BakeStepSettings {
    BakeStepSettings {
        bake_time_millis,
        alarm_settings,
    }
}

pub fn approval_props(
    stage: &str,
    action: &str,
    pipeline_execution_id: &str,
    action_execution_id: &str,
) -> ApprovalProps {
    ApprovalProps {
        pipeline_name: "P".to_string(),
        stage_name: stage.to_string(),
        action_name: action.to_string(),
        pipeline_execution_id: PipelineExecutionId::from(pipeline_execution_id),
        action_execution_id: ActionExecutionId::from(action_execution_id),
        token: ApprovalToken::new(format!("token-{}", action_execution_id)),
    }
}

pub fn execution_detail(
    action_execution_id: &str,
    action: &str,
    start_time: DateTime<Utc>,
) -> ActionExecutionDetail {
    ActionExecutionDetail {
        action_execution_id: ActionExecutionId::from(action_execution_id),
        action_name: action.to_string(),
        stage_name: "Stage".to_string(),
        start_time,
        status: ExecutionStatus::InProgress,
    }
}

pub fn alarm_description(
    name: &str,
    state_value: AlarmStateValue,
    state_updated: Option<DateTime<Utc>>,
) -> AlarmDescription {
    AlarmDescription {
        alarm_name: name.to_string(),
        state_value,
        state_updated,
    }
}

// ─── SnapshotBuilder ─────────────────────────────────────────────────────────

/// Builds a [`PipelineSnapshot`] stage by stage.
///
/// Execution and action methods apply to the most recently added stage.
pub struct SnapshotBuilder {
    pipeline_name: String,
    stages: Vec<StageState>,
}

impl SnapshotBuilder {
    pub fn new(pipeline_name: &str) -> Self {
        SnapshotBuilder {
            pipeline_name: pipeline_name.to_string(),
            stages: Vec::new(),
        }
    }

    pub fn stage(self, name: &str, transition: TransitionState) -> Self {
        self.push_stage(name, Some(transition))
    }

    /// A first stage, which has no inbound transition.
    pub fn source_stage(self, name: &str) -> Self {
        self.push_stage(name, None)
    }

    fn push_stage(mut self, name: &str, inbound_transition: Option<TransitionState>) -> Self {
        self.stages.push(StageState {
            stage_name: name.to_string(),
            inbound_transition,
            latest_execution: None,
            actions: Vec::new(),
        });
        self
    }

    fn last_stage(&mut self) -> &mut StageState {
        self.stages.last_mut().expect("add a stage first")
    }

    pub fn stage_execution(mut self, pipeline_execution_id: &str, status: ExecutionStatus) -> Self {
        self.last_stage().latest_execution = Some(StageExecution {
            pipeline_execution_id: PipelineExecutionId::from(pipeline_execution_id),
            status,
        });
        self
    }

    fn push_action(mut self, name: &str, latest_execution: Option<ActionExecution>) -> Self {
        self.last_stage().actions.push(ActionState {
            action_name: name.to_string(),
            latest_execution,
        });
        self
    }

    /// An in-progress manual approval carrying its execution id and token.
    pub fn approval(self, name: &str, action_execution_id: &str, token: &str) -> Self {
        self.push_action(
            name,
            Some(ActionExecution {
                status: ExecutionStatus::InProgress,
                action_execution_id: Some(ActionExecutionId::from(action_execution_id)),
                token: Some(ApprovalToken::new(token)),
                last_status_change: None,
            }),
        )
    }

    /// An action with a latest execution but no ids or token.
    pub fn action(self, name: &str, status: ExecutionStatus) -> Self {
        self.push_action(
            name,
            Some(ActionExecution {
                status,
                action_execution_id: None,
                token: None,
                last_status_change: None,
            }),
        )
    }

    pub fn action_changed_at(
        self,
        name: &str,
        status: ExecutionStatus,
        changed: DateTime<Utc>,
    ) -> Self {
        self.push_action(
            name,
            Some(ActionExecution {
                status,
                action_execution_id: None,
                token: None,
                last_status_change: Some(changed),
            }),
        )
    }

    /// An action that has never run.
    pub fn idle_action(self, name: &str) -> Self {
        self.push_action(name, None)
    }

    pub fn build(self) -> PipelineSnapshot {
        PipelineSnapshot {
            pipeline_name: self.pipeline_name,
            stages: self.stages,
        }
    }
}

// ─── Recording mocks ─────────────────────────────────────────────────────────

/// Effects received by one or more mocks, in arrival order.
pub type EffectLog = Arc<Mutex<Vec<Effect>>>;

pub fn effect_log() -> EffectLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &EffectLog, effect: impl Into<Effect>) {
    log.lock().unwrap().push(effect.into());
}

type PageKey = (PipelineExecutionId, Option<String>);
type Page = (Vec<ActionExecutionDetail>, Option<String>);

/// Mock pipeline service.
///
/// Writes succeed unless configured otherwise; unregistered reads fail with
/// a not-found error.
#[derive(Default)]
pub struct MockPipeline {
    log: EffectLog,
    snapshot: Option<PipelineSnapshot>,
    pages: HashMap<PageKey, Page>,
    failing_transitions: HashSet<String>,
    failing_approvals: HashSet<String>,
    conflicting_approvals: HashSet<String>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(mut self, log: &EffectLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn with_snapshot(mut self, snapshot: PipelineSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_execution_page(
        mut self,
        pipeline_execution_id: &str,
        token: Option<&str>,
        details: Vec<ActionExecutionDetail>,
        next_token: Option<&str>,
    ) -> Self {
        self.pages.insert(
            (
                PipelineExecutionId::from(pipeline_execution_id),
                token.map(str::to_string),
            ),
            (details, next_token.map(str::to_string)),
        );
        self
    }

    /// Disable and enable calls for this stage fail.
    pub fn failing_transition(mut self, stage: &str) -> Self {
        self.failing_transitions.insert(stage.to_string());
        self
    }

    pub fn failing_approval(mut self, action: &str) -> Self {
        self.failing_approvals.insert(action.to_string());
        self
    }

    /// Put-approval calls for this action report the approval as already resolved.
    pub fn conflicting_approval(mut self, action: &str) -> Self {
        self.conflicting_approvals.insert(action.to_string());
        self
    }

    /// Pipeline effects received so far.
    pub fn effects(&self) -> Vec<PipelineEffect> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Effect::Pipeline(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Received pipeline effects that mutate the pipeline.
    pub fn writes(&self) -> Vec<PipelineEffect> {
        self.effects().into_iter().filter(|e| e.is_write()).collect()
    }

    fn respond(&self, effect: &PipelineEffect) -> Result<PipelineResponse, RemoteError> {
        match effect {
            PipelineEffect::GetPipelineState { pipeline_name } => self
                .snapshot
                .clone()
                .map(PipelineResponse::PipelineState)
                .ok_or_else(|| RemoteError::not_found(format!("pipeline {}", pipeline_name))),
            PipelineEffect::ListActionExecutions {
                pipeline_execution_id,
                next_token,
                ..
            } => self
                .pages
                .get(&(pipeline_execution_id.clone(), next_token.clone()))
                .map(|(details, next)| PipelineResponse::ActionExecutions {
                    details: details.clone(),
                    next_token: next.clone(),
                })
                .ok_or_else(|| {
                    RemoteError::not_found(format!("execution {}", pipeline_execution_id))
                }),
            PipelineEffect::DisableStageTransition { stage_name, .. } => {
                if self.failing_transitions.contains(stage_name) {
                    Err(RemoteError::from_status(500, "disable failed"))
                } else {
                    Ok(PipelineResponse::TransitionDisabled)
                }
            }
            PipelineEffect::EnableStageTransition { stage_name, .. } => {
                if self.failing_transitions.contains(stage_name) {
                    Err(RemoteError::from_status(500, "enable failed"))
                } else {
                    Ok(PipelineResponse::TransitionEnabled)
                }
            }
            PipelineEffect::PutApprovalResult { action_name, .. } => {
                if self.conflicting_approvals.contains(action_name) {
                    Err(RemoteError::conflict("approval already resolved"))
                } else if self.failing_approvals.contains(action_name) {
                    Err(RemoteError::permanent("approval failed"))
                } else {
                    Ok(PipelineResponse::ApprovalRecorded)
                }
            }
        }
    }
}

impl PipelineInterpreter for MockPipeline {
    fn interpret(
        &self,
        effect: PipelineEffect,
    ) -> impl Future<Output = Result<PipelineResponse, RemoteError>> + Send {
        let result = self.respond(&effect);
        record(&self.log, effect);
        async move { result }
    }
}

/// Mock change-calendar service. Unregistered calendars fail with not-found.
#[derive(Default)]
pub struct MockCalendars {
    log: EffectLog,
    states: HashMap<String, CalendarState>,
    failing: HashSet<String>,
}

impl MockCalendars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(mut self, log: &EffectLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn with(mut self, calendar: &str, state: CalendarState) -> Self {
        self.states.insert(calendar.to_string(), state);
        self
    }

    pub fn failing(mut self, calendar: &str) -> Self {
        self.failing.insert(calendar.to_string());
        self
    }

    /// Calendars queried so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Effect::Calendar(CalendarEffect::GetCalendarState { calendar }) => {
                    Some(calendar.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl CalendarInterpreter for MockCalendars {
    fn interpret(
        &self,
        effect: CalendarEffect,
    ) -> impl Future<Output = Result<CalendarResponse, RemoteError>> + Send {
        let CalendarEffect::GetCalendarState { calendar } = &effect;
        let result = if self.failing.contains(calendar) {
            Err(RemoteError::transient(format!("calendar {} unavailable", calendar)))
        } else {
            self.states
                .get(calendar)
                .map(|state| CalendarResponse::State(*state))
                .ok_or_else(|| RemoteError::not_found(format!("calendar {}", calendar)))
        };
        record(&self.log, effect);
        async move { result }
    }
}

/// Mock monitoring service.
///
/// Describe calls return the registered alarms whose names were requested,
/// whatever the group, unless the group is configured to fail.
#[derive(Default)]
pub struct MockMonitoring {
    log: EffectLog,
    alarms: Vec<AlarmDescription>,
    failing_groups: HashSet<AlarmGroup>,
    fail_metrics: bool,
}

impl MockMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(mut self, log: &EffectLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn with_alarm(mut self, alarm: AlarmDescription) -> Self {
        self.alarms.push(alarm);
        self
    }

    pub fn failing_group(mut self, region: &str, assume_role: Option<&str>) -> Self {
        self.failing_groups.insert(AlarmGroup {
            region: region.to_string(),
            assume_role: assume_role.map(str::to_string),
        });
        self
    }

    pub fn failing_metrics(mut self) -> Self {
        self.fail_metrics = true;
        self
    }

    fn monitoring_effects(&self) -> Vec<MonitoringEffect> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Effect::Monitoring(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Describe calls received so far.
    pub fn describe_calls(&self) -> Vec<(AlarmGroup, Vec<String>)> {
        self.monitoring_effects()
            .into_iter()
            .filter_map(|e| match e {
                MonitoringEffect::DescribeAlarms { group, alarm_names } => Some((group, alarm_names)),
                _ => None,
            })
            .collect()
    }

    /// `PutMetricData` effects received so far.
    pub fn metric_puts(&self) -> Vec<MonitoringEffect> {
        self.monitoring_effects()
            .into_iter()
            .filter(|e| matches!(e, MonitoringEffect::PutMetricData { .. }))
            .collect()
    }

    fn respond(&self, effect: &MonitoringEffect) -> Result<MonitoringResponse, RemoteError> {
        match effect {
            MonitoringEffect::DescribeAlarms { group, alarm_names } => {
                if self.failing_groups.contains(group) {
                    return Err(RemoteError::from_status(403, "access denied"));
                }
                Ok(MonitoringResponse::Alarms(
                    self.alarms
                        .iter()
                        .filter(|a| alarm_names.contains(&a.alarm_name))
                        .cloned()
                        .collect(),
                ))
            }
            MonitoringEffect::PutMetricData { .. } => {
                if self.fail_metrics {
                    Err(RemoteError::transient("metrics unavailable"))
                } else {
                    Ok(MonitoringResponse::MetricsPut)
                }
            }
        }
    }
}

impl MonitoringInterpreter for MockMonitoring {
    fn interpret(
        &self,
        effect: MonitoringEffect,
    ) -> impl Future<Output = Result<MonitoringResponse, RemoteError>> + Send {
        let result = self.respond(&effect);
        record(&self.log, effect);
        async move { result }
    }
}
