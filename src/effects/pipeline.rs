//! Pipeline service effect types.
//!
//! These describe pipeline reads and writes as data. The sequencer builds the
//! write effects from decisions, so the exact mutation sent to the service can
//! be logged and asserted on in tests.

use serde::{Deserialize, Serialize};

use crate::types::{
    ActionExecutionDetail, ApprovalToken, PipelineExecutionId, PipelineSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEffect {
    // ─── Reads ───────────────────────────────────────────────────────────────
    /// Fetch the stage/action/transition snapshot.
    GetPipelineState { pipeline_name: String },

    /// Fetch one page of action executions for a pipeline execution.
    ListActionExecutions {
        pipeline_name: String,
        pipeline_execution_id: PipelineExecutionId,
        next_token: Option<String>,
    },

    // ─── Writes ──────────────────────────────────────────────────────────────
    /// Disable the inbound transition of a stage.
    DisableStageTransition {
        pipeline_name: String,
        stage_name: String,
        reason: String,
    },

    /// Enable the inbound transition of a stage.
    EnableStageTransition {
        pipeline_name: String,
        stage_name: String,
    },

    /// Resolve a pending manual approval.
    PutApprovalResult {
        pipeline_name: String,
        stage_name: String,
        action_name: String,
        token: ApprovalToken,
        status: ApprovalStatus,
        summary: String,
    },
}

impl PipelineEffect {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEffect::GetPipelineState { .. } => "get_pipeline_state",
            PipelineEffect::ListActionExecutions { .. } => "list_action_executions",
            PipelineEffect::DisableStageTransition { .. } => "disable_stage_transition",
            PipelineEffect::EnableStageTransition { .. } => "enable_stage_transition",
            PipelineEffect::PutApprovalResult { .. } => "put_approval_result",
        }
    }

    /// Returns true for effects that mutate the pipeline.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            PipelineEffect::GetPipelineState { .. } | PipelineEffect::ListActionExecutions { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineResponse {
    /// Response to `GetPipelineState`.
    PipelineState(PipelineSnapshot),

    /// Response to `ListActionExecutions`.
    ActionExecutions {
        details: Vec<ActionExecutionDetail>,
        /// Present when more pages remain.
        next_token: Option<String>,
    },

    /// Response to `DisableStageTransition`.
    TransitionDisabled,

    /// Response to `EnableStageTransition`.
    TransitionEnabled,

    /// Response to `PutApprovalResult`.
    ApprovalRecorded,
}
