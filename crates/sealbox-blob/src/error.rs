//! Error types for blob storage.

use thiserror::Error;

use sealbox_core::BlobId;

/// Errors that can occur during blob operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The id is unknown or its retention window lapsed. Terminal;
    /// never retried.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The blob was stored as permanent and cannot be deleted before
    /// expiry.
    #[error("blob not deletable: {0}")]
    NotDeletable(BlobId),

    /// A store call failed at the transport level. Retryable.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The backend itself failed (corrupt database, I/O).
    #[error("storage error: {0}")]
    Storage(String),

    /// Downloaded bytes did not hash back to the requested id.
    #[error("content digest mismatch for {0}")]
    DigestMismatch(BlobId),

    /// Bounded retries were exhausted; carries the final error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<BlobError>,
    },
}

/// Result type for blob operations.
pub type Result<T> = std::result::Result<T, BlobError>;
