//! Error Types
//!
//! Failure taxonomy for the job client. Timeout and cancellation are not
//! errors; they are terminal [`JobOutcome`](crate::job::JobOutcome)
//! variants, so callers can tell "provider rejected" from "provider never
//! finished" without string matching.

use thiserror::Error;

/// Maximum number of characters of a provider error body kept in messages.
const MAX_BODY_CHARS: usize = 500;

/// Errors surfaced by the job client and provider adapters
#[derive(Debug, Error)]
pub enum JobError {
    /// Missing or invalid caller-supplied configuration (credential,
    /// required request field). Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider rejected the request with a non-success status.
    /// Status and body are preserved so callers can classify rate-limit
    /// vs. credit exhaustion vs. generic failure.
    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// Network-level failure reaching the provider.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx payload was missing an expected field. Provider contract
    /// violation; surfaced, never guessed around.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl JobError {
    /// Builds a `Provider` error, truncating oversized bodies.
    pub fn provider(status: u16, body: &str) -> Self {
        JobError::Provider {
            status,
            body: body.chars().take(MAX_BODY_CHARS).collect(),
        }
    }

    /// Whether this error may clear up on its own (used by the poll loop
    /// when the policy tolerates transient errors).
    pub fn is_transient(&self) -> bool {
        matches!(self, JobError::Transport(_))
    }
}

/// Result type used throughout the crate
pub type JobResult<T> = Result<T, JobError>;

// =============================================================================
// Tests
// =============================================================================
