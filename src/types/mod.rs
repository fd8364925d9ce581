//! Core domain types for the deployment safety enforcer.
//!
//! Pipeline snapshots, signal states, and the decision records a cycle emits.

pub mod decision;
pub mod ids;
pub mod signal;
pub mod snapshot;

pub use decision::{
    ApprovalProps, BakeAction, BakeDecision, DisableReason, ENFORCER_ACTOR_PREFIX,
    TransitionAction, TransitionDecision, enforcer_actor,
};
pub use ids::{ActionExecutionId, ApprovalToken, PipelineExecutionId, RequestId};
pub use signal::{
    AlarmGroup, AlarmKey, AlarmQuery, AlarmState, CalendarState, MissingAlarmPolicy, SignalState,
};
pub use snapshot::{
    ActionExecution, ActionExecutionDetail, ActionState, ExecutionStatus, PipelineSnapshot,
    StageExecution, StageState, TransitionState,
};
