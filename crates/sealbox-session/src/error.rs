//! Error types for sessions and approvals.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session's ttl has lapsed.
    #[error("session expired at {expires_at_ms}ms (now {now_ms}ms)")]
    SessionExpired { expires_at_ms: i64, now_ms: i64 },

    /// No accepted signature shape validated.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The session has not completed binding.
    #[error("session not bound")]
    NotBound,

    /// Binding was attempted twice.
    #[error("session already bound")]
    AlreadyBound,

    /// The session was revoked.
    #[error("session revoked")]
    Revoked,

    /// Serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] sealbox_core::CoreError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
