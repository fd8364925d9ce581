//! Point-in-time view of a deployment pipeline.
//!
//! A `PipelineSnapshot` is fetched fresh at the start of every decision cycle
//! and never mutated. Every decision the engine makes is derived from it plus
//! the gathered signal states, so nothing here carries engine-owned state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActionExecutionId, ApprovalToken, PipelineExecutionId};

/// Execution status reported by the pipeline service for stages and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    InProgress,
    Succeeded,
    Failed,
    Stopped,
    Stopping,
    Abandoned,
    Cancelled,
    Superseded,
}

impl ExecutionStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ExecutionStatus::InProgress)
    }
}

/// The gate controlling whether executions may flow into a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionState {
    pub enabled: bool,
    /// Free-text reason recorded when the transition was disabled.
    ///
    /// When the enforcer disabled it, this holds the provenance tag written by
    /// [`crate::reason::format_disable_reason`].
    pub disabled_reason: Option<String>,
}

impl TransitionState {
    pub fn enabled() -> Self {
        TransitionState {
            enabled: true,
            disabled_reason: None,
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        TransitionState {
            enabled: false,
            disabled_reason: Some(reason.into()),
        }
    }
}

/// The latest execution of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExecution {
    pub pipeline_execution_id: PipelineExecutionId,
    pub status: ExecutionStatus,
}

/// The latest execution of an action.
///
/// Approval actions that are in progress carry the token and action execution
/// id needed to resolve them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecution {
    pub status: ExecutionStatus,
    pub action_execution_id: Option<ActionExecutionId>,
    pub token: Option<ApprovalToken>,
    pub last_status_change: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub action_name: String,
    pub latest_execution: Option<ActionExecution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageState {
    pub stage_name: String,
    /// `None` for the first stage, which has no inbound transition.
    pub inbound_transition: Option<TransitionState>,
    pub latest_execution: Option<StageExecution>,
    pub actions: Vec<ActionState>,
}

impl StageState {
    /// Returns the state of the named action in this stage, if any.
    pub fn action(&self, action_name: &str) -> Option<&ActionState> {
        self.actions.iter().find(|a| a.action_name == action_name)
    }
}

/// Read-only view of a pipeline at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub pipeline_name: String,
    pub stages: Vec<StageState>,
}

impl PipelineSnapshot {
    /// Returns the named stage, if present.
    pub fn stage(&self, stage_name: &str) -> Option<&StageState> {
        self.stages.iter().find(|s| s.stage_name == stage_name)
    }
}

/// One entry from the paginated action-execution listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecutionDetail {
    pub action_execution_id: ActionExecutionId,
    pub action_name: String,
    pub stage_name: String,
    pub start_time: DateTime<Utc>,
    pub status: ExecutionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_service_spelling() {
        let json = serde_json::to_string(&ExecutionStatus::InProgress).unwrap();
        assert_eq!(json, "\"InProgress\"");
        let parsed: ExecutionStatus = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(parsed, ExecutionStatus::Failed);
    }

    #[test]
    fn stage_lookup_by_name() {
        let snapshot = PipelineSnapshot {
            pipeline_name: "P".to_string(),
            stages: vec![StageState {
                stage_name: "Beta".to_string(),
                inbound_transition: Some(TransitionState::enabled()),
                latest_execution: None,
                actions: vec![ActionState {
                    action_name: "Bake".to_string(),
                    latest_execution: None,
                }],
            }],
        };

        let stage = snapshot.stage("Beta").unwrap();
        assert!(stage.action("Bake").is_some());
        assert!(stage.action("Deploy").is_none());
        assert!(snapshot.stage("Prod").is_none());
    }
}
