//! Error types for threshold encryption.

use thiserror::Error;

/// Errors that can occur during threshold operations.
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// Threshold outside `1 <= t <= n <= 255`.
    #[error("invalid threshold: t={threshold}, n={servers}")]
    InvalidThreshold { threshold: u8, servers: usize },

    /// Fewer than `t` valid, distinct-server shares were obtained.
    /// Terminal for the attempt: restart from a fresh approval/session.
    #[error("insufficient shares: got {got}, need {need}")]
    InsufficientShares { got: usize, need: usize },

    /// A key server rejected the approval payload (membership or
    /// namespace-prefix check failed). Terminal for the attempt.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The session's ttl lapsed before or during the attempt.
    #[error("session expired")]
    SessionExpired,

    /// The encrypted object is malformed or from an unknown version.
    #[error("invalid encrypted object: {0}")]
    InvalidObject(String),

    /// Encryption of a payload or share failed.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption of a payload or share failed.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// A key-server call failed at the transport level.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Session error (binding, request signatures).
    #[error("session error: {0}")]
    SessionError(#[from] sealbox_session::SessionError),

    /// Registry error surfaced through a server's approval evaluation.
    #[error("registry error: {0}")]
    RegistryError(#[from] sealbox_registry::RegistryError),
}

/// Result type for threshold operations.
pub type Result<T> = std::result::Result<T, ThresholdError>;
