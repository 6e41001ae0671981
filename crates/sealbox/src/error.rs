//! Unified error type for the client facade.
//!
//! Sub-crate errors surface verbatim: an `InvalidCapability` from the
//! registry or a `SessionExpired` from the threshold layer is the same
//! error the caller would see talking to those crates directly.

use thiserror::Error;

/// Errors surfaced by the Sealbox client.
#[derive(Debug, Error)]
pub enum SealboxError {
    /// Core primitive error.
    #[error(transparent)]
    Core(#[from] sealbox_core::CoreError),

    /// Registry error (capabilities, membership, ledger).
    #[error(transparent)]
    Registry(#[from] sealbox_registry::RegistryError),

    /// Session error (binding, expiry, signature shapes).
    #[error(transparent)]
    Session(#[from] sealbox_session::SessionError),

    /// Threshold encryption error (quorum, proofs, ciphertext).
    #[error(transparent)]
    Threshold(#[from] sealbox_threshold::ThresholdError),

    /// Blob storage error (transport, retention, digests).
    #[error(transparent)]
    Blob(#[from] sealbox_blob::BlobError),

    /// The ledger returned an unexpected outcome shape for a call.
    #[error("unexpected ledger outcome: {0}")]
    UnexpectedOutcome(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SealboxError>;
