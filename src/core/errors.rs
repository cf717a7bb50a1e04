// src/core/errors.rs

//! Error taxonomy for the plan-generation pipeline.
//!
//! The model boundary reports typed kinds (`ModelError`) rather than relying
//! on message-substring sniffing; the AI wrapper maps those onto `AiError`
//! after adding timing/attempt information.

use thiserror::Error;

/// Errors surfaced by the black-box generative model collaborator.
/// Tagged at the source so retry policy never has to parse messages.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model rate limited: {0}")]
    RateLimited(String),

    #[error("model call timed out: {0}")]
    Timeout(String),

    #[error("model call failed: {0}")]
    Other(String),
}

/// Classified AI-generation failures, as seen by the orchestrator.
#[derive(Debug, Error)]
pub enum AiError {
    /// Provider is rate limiting us. Never retried: waiting does not help
    /// and burns daily-quota headroom.
    #[error("AI rate limit hit: {message}")]
    RateLimited { message: String },

    /// The call exceeded the configured timeout (either reported by the
    /// model boundary or measured by the wrapper).
    #[error("AI generation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Anything else; retryable with backoff.
    #[error("AI generation failed: {message}")]
    Generation { message: String },
}

impl AiError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AiError::RateLimited { .. })
    }
}

/// Errors from the pure vector operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VectorError {
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}
