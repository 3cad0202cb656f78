//! Error taxonomy shared across the ticket crates.

use serde::{Deserialize, Serialize};

/// Acceptance failures.
///
/// Validation runs before any side effect, so a rejected request was never
/// enqueued and no operation id is returned for it.
#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Validation passed but the enqueue did not. The operation was never
    /// created; the generated id is discarded, not leaked.
    #[error("work queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A dequeued message that cannot be unwrapped.
///
/// Permanent: redelivery cannot repair a bad envelope, so the worker driver
/// dead-letters it without retrying.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: missing reserved field {0}")]
    MissingField(&'static str),

    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// Business-logic failure returned by a processor.
///
/// Persisted as a Failure artifact under the operation key so a client can
/// always learn why the operation failed, not just that it failed.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProcessingError {
    pub code: String,
    pub message: String,
}

impl ProcessingError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Body of a persisted Failure artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    pub error: ProcessingError,
}
