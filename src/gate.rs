//! Transition gate evaluation.
//!
//! Decides, for every stage gated by change calendars, whether its inbound
//! transition should be enabled, disabled, or left alone. Pure: the same
//! snapshot, calendar states and request id always yield the same actions.

use tracing::debug;

use crate::config::StageCalendars;
use crate::reason::is_enforcer_reason;
use crate::types::{
    DisableReason, PipelineSnapshot, RequestId, SignalState, TransitionAction, TransitionDecision,
};

/// Computes one transition action per configured stage, in configuration order.
///
/// Decision rules, first match wins:
/// 1. stage missing from the snapshot (or without an inbound transition) → `SKIP:NOT_FOUND`
/// 2. disabled by someone other than the enforcer → `SKIP:EXTERNAL_ACTOR`
/// 3. any configured calendar `CLOSED` → `DISABLE`, tagged with the closed calendars
/// 4. already enabled → `SKIP:NO_OP`
/// 5. otherwise → `ENABLE`
///
/// Rule 3 applies even to transitions the enforcer already disabled, so the tag
/// always names the calendars closed as of the latest cycle.
pub fn calculate_transition_actions(
    snapshot: &PipelineSnapshot,
    stage_calendars: &StageCalendars,
    signals: &SignalState,
    request_id: &RequestId,
) -> Vec<TransitionAction> {
    let pipeline_name = snapshot.pipeline_name.as_str();

    stage_calendars
        .iter()
        .map(|(stage_name, calendars)| {
            let Some(stage) = snapshot.stage(stage_name) else {
                return TransitionAction::new(
                    pipeline_name,
                    stage_name,
                    TransitionDecision::SkipNotFound,
                );
            };

            let Some(transition) = &stage.inbound_transition else {
                let mut action = TransitionAction::new(
                    pipeline_name,
                    stage_name,
                    TransitionDecision::SkipNotFound,
                );
                action.error = Some("stage has no inbound transition".to_string());
                return action;
            };

            if !transition.enabled && !is_enforcer_reason(transition.disabled_reason.as_deref()) {
                debug!(stage = stage_name, "Transition disabled by an external actor");
                let mut action = TransitionAction::new(
                    pipeline_name,
                    stage_name,
                    TransitionDecision::SkipExternalActor,
                );
                action.error = transition.disabled_reason.clone();
                return action;
            }

            let closed: Vec<String> = calendars
                .iter()
                .filter(|calendar| signals.is_closed(calendar))
                .cloned()
                .collect();

            if !closed.is_empty() {
                let mut action =
                    TransitionAction::new(pipeline_name, stage_name, TransitionDecision::Disable);
                action.disable_reason = Some(DisableReason::for_calendars(request_id, closed));
                return action;
            }

            let decision = if transition.enabled {
                TransitionDecision::SkipNoOp
            } else {
                TransitionDecision::Enable
            };
            TransitionAction::new(pipeline_name, stage_name, decision)
        })
        .collect()
}
