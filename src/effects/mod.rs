//! Effects-as-data for the remote services the enforcer talks to.
//!
//! Every remote read and write is described by a serializable effect value and
//! executed by an injected interpreter. This keeps:
//! - decision logic pure and testable with recording mock interpreters,
//! - every mutation traceable, since the effect can be logged before it runs,
//! - the core independent of any particular cloud SDK.

use serde::{Deserialize, Serialize};

pub mod interpreter;
pub mod pipeline;
pub mod signals;

pub use interpreter::{CalendarInterpreter, MonitoringInterpreter, PipelineInterpreter};
pub use pipeline::{ApprovalStatus, PipelineEffect, PipelineResponse};
pub use signals::{
    AlarmDescription, AlarmStateValue, CalendarEffect, CalendarResponse, MetricDatum, MetricUnit,
    MonitoringEffect, MonitoringResponse,
};

/// Any effect the enforcer may issue.
///
/// Used for uniform logging of what a cycle intends to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "effect_type", rename_all = "snake_case")]
pub enum Effect {
    Pipeline(PipelineEffect),
    Calendar(CalendarEffect),
    Monitoring(MonitoringEffect),
}

impl From<PipelineEffect> for Effect {
    fn from(effect: PipelineEffect) -> Self {
        Effect::Pipeline(effect)
    }
}

impl From<CalendarEffect> for Effect {
    fn from(effect: CalendarEffect) -> Self {
        Effect::Calendar(effect)
    }
}

impl From<MonitoringEffect> for Effect {
    fn from(effect: MonitoringEffect) -> Self {
        Effect::Monitoring(effect)
    }
}
