//! Provenance tag formatting.

use crate::types::DisableReason;

/// Delimiter wrapping the JSON payload on both sides.
pub const REASON_FENCE: &str = "```";

/// Renders a disable reason as a fenced, pretty-printed JSON block.
pub fn format_disable_reason(reason: &DisableReason) -> String {
    // Serializing plain strings cannot fail; the fallback keeps the actor.
    let json = serde_json::to_string_pretty(reason)
        .unwrap_or_else(|_| format!("{{\"actor\":{:?}}}", reason.actor));
    format!("{}\n{}\n{}", REASON_FENCE, json, REASON_FENCE)
}
