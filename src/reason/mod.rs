//! Provenance tag formatting and parsing.
//!
//! When the enforcer disables a transition it writes a machine-readable tag
//! into the transition's free-text disabled reason. That tag is the enforcer's
//! only memory across cycles: a later cycle parses it to tell "I disabled this"
//! apart from an operator who disabled it by hand.
//!
//! # Format
//!
//! ````text
//! ```
//! {
//!   "actor": "Enforcer@<request id>",
//!   "calendars": ["FreezeCalendar"]
//! }
//! ```
//! ````
//!
//! The markdown fence keeps the JSON readable in the pipeline console.

pub mod format;
pub mod parse;

pub use format::{REASON_FENCE, format_disable_reason};
pub use parse::{ParseError, is_enforcer_reason, parse_disable_reason};
