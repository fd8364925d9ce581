//! Provenance tag parsing.
//!
//! Parsing is deliberately lenient about whitespace and strict about shape:
//! anything that is not a fenced JSON object with an `actor` field is foreign.

use thiserror::Error;
use tracing::debug;

use super::format::REASON_FENCE;
use crate::types::DisableReason;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The reason is not wrapped in the expected fence.
    #[error("provenance fence not found")]
    FenceNotFound,

    /// The fenced payload is not a valid tag.
    #[error("invalid JSON in provenance tag: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parses a disabled-reason string back into the tag the enforcer wrote.
///
/// Accepts both the multi-line form produced by
/// [`format_disable_reason`](super::format_disable_reason) and a single-line
/// "```{...}```" form.
pub fn parse_disable_reason(reason: &str) -> Result<DisableReason, ParseError> {
    let json = extract_json(reason)?;
    Ok(serde_json::from_str(json)?)
}

/// Returns true if the reason is a tag written by some enforcer cycle.
///
/// Absent, unparseable, and foreign-actor reasons all return false.
pub fn is_enforcer_reason(reason: Option<&str>) -> bool {
    let Some(reason) = reason else {
        return false;
    };

    match parse_disable_reason(reason) {
        Ok(tag) if tag.is_enforcer() => true,
        Ok(tag) => {
            debug!(actor = %tag.actor, "Disabled reason actor is not the enforcer");
            false
        }
        Err(e) => {
            debug!(reason, error = %e, "Disabled reason is not a provenance tag");
            false
        }
    }
}

fn extract_json(reason: &str) -> Result<&str, ParseError> {
    let trimmed = reason.trim();
    let inner = trimmed
        .strip_prefix(REASON_FENCE)
        .and_then(|rest| rest.strip_suffix(REASON_FENCE))
        .ok_or(ParseError::FenceNotFound)?;
    Ok(inner.trim())
}
