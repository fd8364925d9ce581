//! Remote service error types.
//!
//! Interpreters map their transport/SDK errors into `RemoteError` so the core
//! can reason about failures without knowing which client produced them. The
//! kind matters in two places:
//!
//! - **Conflict** on a put-approval means the token was already used or the
//!   approval was already resolved. The sequencer tolerates it, since a repeat
//!   tick can legitimately try to resolve the same approval twice.
//! - Everything else is reported per item and surfaced at the end of the cycle.
//!
//! The engine never retries; the next scheduled tick re-derives state.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Throttling, 5xx, timeouts. The next tick will likely succeed.
    Transient,

    /// Access denied, validation failures and other errors needing a human.
    Permanent,

    /// The addressed resource does not exist.
    NotFound,

    /// The request conflicts with current remote state (e.g. an approval
    /// token that has already been used).
    Conflict,
}

impl RemoteErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteErrorKind::Transient)
    }
}

/// An error returned by a remote pipeline, calendar, or monitoring service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "remote error (HTTP {}): {}", code, self.message),
            None => write!(f, "remote error: {}", self.message),
        }
    }
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Permanent, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Conflict, message)
    }

    /// Builds an error from an HTTP status and message, categorizing by status.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = match status_code {
            404 => RemoteErrorKind::NotFound,
            409 => RemoteErrorKind::Conflict,
            429 => RemoteErrorKind::Transient,
            400 if is_throttling_message(&message) => RemoteErrorKind::Transient,
            code if (500..600).contains(&code) => RemoteErrorKind::Transient,
            _ => RemoteErrorKind::Permanent,
        };
        Self {
            kind,
            status_code: Some(status_code),
            message,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == RemoteErrorKind::Conflict
    }
}

/// Some services report throttling as a 400 with a message rather than a 429.
fn is_throttling_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("throttl")
        || message_lower.contains("rate exceeded")
        || message_lower.contains("too many requests")
}
