//! Ordered execution of a cycle's decisions.
//!
//! Decisions become [`PipelineEffect`]s and run in three strict phases:
//!
//! 1. **Disable**: close gates before anything can promote.
//! 2. **Resolve approvals**: rejections first, then approvals.
//! 3. **Enable**: open gates only after approvals are settled.
//!
//! Items within a phase run concurrently; a phase starts only after the
//! previous one has fully completed. A failed item never stops the others or
//! later phases: each item yields an [`ActionOutcome`] and the caller decides
//! what a failure means for the cycle.

use std::fmt;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::effects::{ApprovalStatus, PipelineEffect, PipelineInterpreter};
use crate::error::RemoteError;
use crate::reason::format_disable_reason;
use crate::types::{
    ApprovalProps, BakeAction, BakeDecision, DisableReason, RequestId, TransitionAction,
    TransitionDecision, enforcer_actor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Disable,
    Reject,
    Approve,
    Enable,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Disable => "disable",
            Phase::Reject => "reject",
            Phase::Approve => "approve",
            Phase::Enable => "enable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    /// The approval was already resolved by someone else (or a prior cycle).
    AlreadyResolved,
    Failed(String),
}

/// Result of one sequenced item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub phase: Phase,
    /// `stage` for transitions, `stage/action` for approvals.
    pub target: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

/// Renders the summary recorded on a rejected approval.
pub fn reject_summary(request_id: &RequestId, alarms: &[String]) -> String {
    format!("{} due to {}", enforcer_actor(request_id), alarms.join(", "))
}

/// Renders the summary recorded on an approved approval.
pub fn approve_summary(request_id: &RequestId) -> String {
    format!("Approved by {}", enforcer_actor(request_id))
}

fn disable_effect(action: &TransitionAction, request_id: &RequestId) -> PipelineEffect {
    let reason = action
        .disable_reason
        .clone()
        .unwrap_or_else(|| DisableReason::for_calendars(request_id, Vec::new()));
    PipelineEffect::DisableStageTransition {
        pipeline_name: action.pipeline_name.clone(),
        stage_name: action.stage_name.clone(),
        reason: format_disable_reason(&reason),
    }
}

fn enable_effect(action: &TransitionAction) -> PipelineEffect {
    PipelineEffect::EnableStageTransition {
        pipeline_name: action.pipeline_name.clone(),
        stage_name: action.stage_name.clone(),
    }
}

fn approval_effect(props: &ApprovalProps, status: ApprovalStatus, summary: String) -> PipelineEffect {
    PipelineEffect::PutApprovalResult {
        pipeline_name: props.pipeline_name.clone(),
        stage_name: props.stage_name.clone(),
        action_name: props.action_name.clone(),
        token: props.token.clone(),
        status,
        summary,
    }
}

/// Builds the phased effect plan without executing it.
///
/// Phases are returned in execution order; empty phases are omitted.
pub fn plan_effects(
    transitions: &[TransitionAction],
    bakes: &[BakeAction],
    request_id: &RequestId,
) -> Vec<(Phase, Vec<(String, PipelineEffect)>)> {
    let disables: Vec<(String, PipelineEffect)> = transitions
        .iter()
        .filter(|a| a.decision == TransitionDecision::Disable)
        .map(|a| (a.stage_name.clone(), disable_effect(a, request_id)))
        .collect();

    let approvals = |decision: BakeDecision| -> Vec<(String, PipelineEffect)> {
        bakes
            .iter()
            .filter(|b| b.decision == decision)
            .filter_map(|b| {
                let props = b.approval_props.as_ref()?;
                let target = format!("{}/{}", props.stage_name, props.action_name);
                let effect = match decision {
                    BakeDecision::Reject => approval_effect(
                        props,
                        ApprovalStatus::Rejected,
                        reject_summary(request_id, b.reject_reasons.as_deref().unwrap_or(&[])),
                    ),
                    _ => approval_effect(props, ApprovalStatus::Approved, approve_summary(request_id)),
                };
                Some((target, effect))
            })
            .collect()
    };

    let enables: Vec<(String, PipelineEffect)> = transitions
        .iter()
        .filter(|a| a.decision == TransitionDecision::Enable)
        .map(|a| (a.stage_name.clone(), enable_effect(a)))
        .collect();

    [
        (Phase::Disable, disables),
        (Phase::Reject, approvals(BakeDecision::Reject)),
        (Phase::Approve, approvals(BakeDecision::Approve)),
        (Phase::Enable, enables),
    ]
    .into_iter()
    .filter(|(_, effects)| !effects.is_empty())
    .collect()
}

/// Executes the plan phase by phase and returns one outcome per item.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn execute<P>(
    pipeline: &P,
    transitions: &[TransitionAction],
    bakes: &[BakeAction],
    request_id: &RequestId,
) -> Vec<ActionOutcome>
where
    P: PipelineInterpreter,
{
    let mut outcomes = Vec::new();
    for (phase, effects) in plan_effects(transitions, bakes, request_id) {
        outcomes.extend(run_phase(pipeline, phase, effects).await);
    }
    outcomes
}

#[instrument(skip(pipeline, effects), fields(count = effects.len()))]
async fn run_phase<P>(
    pipeline: &P,
    phase: Phase,
    effects: Vec<(String, PipelineEffect)>,
) -> Vec<ActionOutcome>
where
    P: PipelineInterpreter,
{
    let outcomes = join_all(effects.into_iter().map(|(target, effect)| async move {
        let result = pipeline.interpret(effect).await;
        ActionOutcome {
            phase,
            status: classify(phase, &target, result.map(|_| ())),
            target,
        }
    }))
    .await;

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    info!(%phase, applied = outcomes.len() - failed, failed, "Phase complete");
    outcomes
}

fn classify(phase: Phase, target: &str, result: Result<(), RemoteError>) -> OutcomeStatus {
    match result {
        Ok(()) => OutcomeStatus::Applied,
        Err(e) if e.is_conflict() && matches!(phase, Phase::Reject | Phase::Approve) => {
            info!(%phase, item = target, error = %e, "Approval already resolved");
            OutcomeStatus::AlreadyResolved
        }
        Err(e) => {
            warn!(%phase, item = target, error = %e, "Action failed");
            OutcomeStatus::Failed(e.to_string())
        }
    }
}
