//! Error types for thread-triage.
//!
//! The inference engine itself never fails on message content — malformed or
//! missing signals degrade to "signal absent". Errors exist only on the AI
//! collaborator contract path, which upstream callers drive.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("AI collaborator error: {0}")]
    Ai(#[from] AiError),
}

/// AI collaborator errors, surfaced by `AiAugmenter` implementations.
///
/// The resolver treats any of these identically to "no AI signal available"
/// when they arrive attached to a message as a failed outcome.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Model {model_id} request failed: {reason}")]
    RequestFailed { model_id: String, reason: String },

    #[error("Model {model_id} returned unparsable output: {reason}")]
    InvalidResponse { model_id: String, reason: String },

    #[error("Model {model_id} timed out after {seconds}s")]
    Timeout { model_id: String, seconds: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
