//! Error types for core primitives.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An input was not usable as configured (bad lengths, empty fields,
    /// ids that cannot produce a namespace).
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// A byte string did not parse as a public key.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// A signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A byte string had the wrong length for its target type.
    #[error("invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
