//! Decision records produced by a cycle.
//!
//! These are data, not commands: they are logged as structured summaries
//! before the sequencer turns them into pipeline effects.

use serde::{Deserialize, Serialize};

use super::ids::{ActionExecutionId, ApprovalToken, PipelineExecutionId, RequestId};

/// Prefix identifying the enforcer as the actor in a provenance tag.
pub const ENFORCER_ACTOR_PREFIX: &str = "Enforcer@";

/// Structured provenance tag written into a transition's disabled reason.
///
/// This is the only durable memory the enforcer has across cycles: a later
/// cycle parses it back to recognize transitions it disabled itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableReason {
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendars: Option<Vec<String>>,
}

impl DisableReason {
    /// Creates a tag attributing the closure to the given cycle.
    pub fn for_calendars(request_id: &RequestId, calendars: Vec<String>) -> Self {
        DisableReason {
            actor: enforcer_actor(request_id),
            calendars: Some(calendars),
        }
    }

    /// Returns true if the actor is the enforcer (any cycle).
    pub fn is_enforcer(&self) -> bool {
        self.actor.starts_with(ENFORCER_ACTOR_PREFIX)
    }
}

/// Renders the actor string for a cycle, e.g. `Enforcer@1234`.
pub fn enforcer_actor(request_id: &RequestId) -> String {
    format!("{}{}", ENFORCER_ACTOR_PREFIX, request_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionDecision {
    #[serde(rename = "ENABLE")]
    Enable,
    #[serde(rename = "DISABLE")]
    Disable,
    /// The configured stage does not exist in the pipeline.
    #[serde(rename = "SKIP:NOT_FOUND")]
    SkipNotFound,
    /// Nothing to change.
    #[serde(rename = "SKIP:NO_OP")]
    SkipNoOp,
    /// Someone other than the enforcer disabled the transition; leave it alone.
    #[serde(rename = "SKIP:EXTERNAL_ACTOR")]
    SkipExternalActor,
}

impl TransitionDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionDecision::Enable => "ENABLE",
            TransitionDecision::Disable => "DISABLE",
            TransitionDecision::SkipNotFound => "SKIP:NOT_FOUND",
            TransitionDecision::SkipNoOp => "SKIP:NO_OP",
            TransitionDecision::SkipExternalActor => "SKIP:EXTERNAL_ACTOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAction {
    pub pipeline_name: String,
    pub stage_name: String,
    pub decision: TransitionDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_reason: Option<DisableReason>,
    /// For `SKIP:EXTERNAL_ACTOR`, the foreign reason string, for visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransitionAction {
    pub fn new(
        pipeline_name: impl Into<String>,
        stage_name: impl Into<String>,
        decision: TransitionDecision,
    ) -> Self {
        TransitionAction {
            pipeline_name: pipeline_name.into(),
            stage_name: stage_name.into(),
            decision,
            disable_reason: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakeDecision {
    /// Still baking; check again next cycle.
    Continue,
    Approve,
    Reject,
    /// The approval is no longer pending.
    Done,
}

/// Everything needed to resolve a pending approval remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalProps {
    pub pipeline_name: String,
    pub stage_name: String,
    pub action_name: String,
    pub pipeline_execution_id: PipelineExecutionId,
    pub action_execution_id: ActionExecutionId,
    pub token: ApprovalToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeAction {
    pub action_name: String,
    pub decision: BakeDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_props: Option<ApprovalProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reasons: Option<Vec<String>>,
}

impl BakeAction {
    pub fn done(action_name: impl Into<String>) -> Self {
        BakeAction {
            action_name: action_name.into(),
            decision: BakeDecision::Done,
            approval_props: None,
            reject_reasons: None,
        }
    }

    pub fn continue_baking(action_name: impl Into<String>) -> Self {
        BakeAction {
            action_name: action_name.into(),
            decision: BakeDecision::Continue,
            approval_props: None,
            reject_reasons: None,
        }
    }

    pub fn approve(props: ApprovalProps) -> Self {
        BakeAction {
            action_name: props.action_name.clone(),
            decision: BakeDecision::Approve,
            approval_props: Some(props),
            reject_reasons: None,
        }
    }

    pub fn reject(props: ApprovalProps, reasons: Vec<String>) -> Self {
        BakeAction {
            action_name: props.action_name.clone(),
            decision: BakeDecision::Reject,
            approval_props: Some(props),
            reject_reasons: Some(reasons),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_decision_wire_names() {
        for decision in [
            TransitionDecision::Enable,
            TransitionDecision::Disable,
            TransitionDecision::SkipNotFound,
            TransitionDecision::SkipNoOp,
            TransitionDecision::SkipExternalActor,
        ] {
            let json = serde_json::to_string(&decision).unwrap();
            assert_eq!(json, format!("\"{}\"", decision.as_str()));
        }
    }

    #[test]
    fn disable_reason_omits_absent_calendars() {
        let reason = DisableReason {
            actor: "Enforcer@x".to_string(),
            calendars: None,
        };
        assert_eq!(
            serde_json::to_string(&reason).unwrap(),
            r#"{"actor":"Enforcer@x"}"#
        );
    }

    #[test]
    fn actor_carries_request_id() {
        let reason = DisableReason::for_calendars(&RequestId::from("req-1"), vec![]);
        assert_eq!(reason.actor, "Enforcer@req-1");
        assert!(reason.is_enforcer());
    }

    #[test]
    fn foreign_actor_is_not_enforcer() {
        let reason = DisableReason {
            actor: "alice".to_string(),
            calendars: None,
        };
        assert!(!reason.is_enforcer());
    }
}
