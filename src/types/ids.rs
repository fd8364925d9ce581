//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of the various opaque ids the pipeline
//! service hands out (e.g., passing an action execution id where a pipeline
//! execution id is expected) and make signatures self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one decision cycle.
///
/// Rendered into the provenance tag as `Enforcer@<request id>`, so it must be
/// stable for the duration of a cycle. Generated fresh for each scheduled tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(s: impl Into<String>) -> Self {
        RequestId(s.into())
    }

    /// Generates a random request id.
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId(s.to_string())
    }
}

/// Identifier of one run of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineExecutionId(pub String);

impl PipelineExecutionId {
    pub fn new(s: impl Into<String>) -> Self {
        PipelineExecutionId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PipelineExecutionId {
    fn from(s: &str) -> Self {
        PipelineExecutionId(s.to_string())
    }
}

/// Identifier of one run of a single action within a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionExecutionId(pub String);

impl ActionExecutionId {
    pub fn new(s: impl Into<String>) -> Self {
        ActionExecutionId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionExecutionId {
    fn from(s: &str) -> Self {
        ActionExecutionId(s.to_string())
    }
}

/// Single-use token required to resolve a pending manual approval.
///
/// `Display` shows only a short prefix so tokens do not end up verbatim in
/// logs; the full value is still serialized when the approval is put.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalToken(pub String);

impl ApprovalToken {
    pub fn new(s: impl Into<String>) -> Self {
        ApprovalToken(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> &str {
        self.0.get(..4).unwrap_or("")
    }
}

impl fmt::Debug for ApprovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApprovalToken({}…)", self.redacted())
    }
}

impl fmt::Display for ApprovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", self.redacted())
    }
}

impl From<&str> for ApprovalToken {
    fn from(s: &str) -> Self {
        ApprovalToken(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ActionExecutionId::new("a-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a-1\"");

        let parsed: PipelineExecutionId = serde_json::from_str("\"p-9\"").unwrap();
        assert_eq!(parsed, PipelineExecutionId::from("p-9"));
    }

    #[test]
    fn approval_token_is_redacted_in_display_and_debug() {
        let token = ApprovalToken::new("abcdef-secret");
        assert_eq!(token.to_string(), "abcd…");
        assert_eq!(format!("{:?}", token), "ApprovalToken(abcd…)");
        assert_eq!(token.as_str(), "abcdef-secret");
    }

    #[test]
    fn short_approval_token_display_does_not_panic() {
        let token = ApprovalToken::new("ab");
        assert_eq!(token.to_string(), "…");
    }
}
