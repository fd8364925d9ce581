//! Deployment safety enforcer: a scheduled safety gate for multi-stage
//! deployment pipelines.
//!
//! Each decision cycle blocks promotion into stages whose change calendars
//! are closed, re-opens stages it blocked itself once their calendars open,
//! and resolves timed "bake" approvals, rejecting any whose guarding alarms
//! fired during the bake window.
//!
//! Remote services are reached only through the interpreter traits in
//! [`effects`]; [`engine::Enforcer`] wires them into a cycle and
//! [`schedule::run_scheduled`] runs cycles periodically.

pub mod bake;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod reason;
pub mod schedule;
pub mod sequencer;
pub mod signals;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;
