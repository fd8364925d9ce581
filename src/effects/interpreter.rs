//! Effect interpreter traits.
//!
//! Concrete clients for the pipeline, calendar and monitoring services live
//! outside this crate; they implement these traits and are injected into the
//! [`Enforcer`](crate::engine::Enforcer). Implementations are constructed once
//! per process and shared by reference across the concurrent calls of a cycle.
//!
//! Interpreters map their transport errors into [`RemoteError`] and must not
//! retry on the engine's behalf: a failed cycle is corrected by the next tick.
//!
//! # Example (mock for testing)
//!
//! ```ignore
//! struct FixedCalendars(HashMap<String, CalendarState>);
//!
//! impl CalendarInterpreter for FixedCalendars {
//!     async fn interpret(&self, effect: CalendarEffect) -> Result<CalendarResponse, RemoteError> {
//!         let CalendarEffect::GetCalendarState { calendar } = effect;
//!         self.0
//!             .get(&calendar)
//!             .map(|s| CalendarResponse::State(*s))
//!             .ok_or_else(|| RemoteError::not_found(calendar))
//!     }
//! }
//! ```

use std::future::Future;

use crate::error::RemoteError;

use super::pipeline::{PipelineEffect, PipelineResponse};
use super::signals::{CalendarEffect, CalendarResponse, MonitoringEffect, MonitoringResponse};

/// Interprets pipeline effects against the pipeline service.
pub trait PipelineInterpreter {
    fn interpret(
        &self,
        effect: PipelineEffect,
    ) -> impl Future<Output = Result<PipelineResponse, RemoteError>> + Send;
}

/// Interprets calendar effects against the change-calendar service.
pub trait CalendarInterpreter {
    fn interpret(
        &self,
        effect: CalendarEffect,
    ) -> impl Future<Output = Result<CalendarResponse, RemoteError>> + Send;
}

/// Interprets monitoring effects against the alarm/metrics service.
///
/// `DescribeAlarms` carries the region and optional role to assume; the
/// interpreter should keep one client/session per such pair so cross-account
/// authentication happens once per group rather than once per alarm.
pub trait MonitoringInterpreter {
    fn interpret(
        &self,
        effect: MonitoringEffect,
    ) -> impl Future<Output = Result<MonitoringResponse, RemoteError>> + Send;
}
