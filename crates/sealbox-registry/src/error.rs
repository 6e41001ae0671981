//! Error types for the registry.

use thiserror::Error;

use sealbox_core::{Address, ObjectId};

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The presented capability is not bound to the target group.
    #[error("invalid capability: not bound to group {group_id}")]
    InvalidCapability { group_id: ObjectId },

    /// The address is already a member of the group.
    #[error("duplicate member: {address} already in group {group_id}")]
    DuplicateMember {
        group_id: ObjectId,
        address: Address,
    },

    /// The address is not a member of the group.
    ///
    /// Internal only: removal is idempotent and never surfaces this to
    /// callers.
    #[error("member not found: {address} not in group {group_id}")]
    MemberNotFound {
        group_id: ObjectId,
        address: Address,
    },

    /// No group exists with the given id.
    #[error("group not found: {0}")]
    GroupNotFound(ObjectId),

    /// The ledger rejected or failed to process a transaction.
    #[error("ledger error: {0}")]
    LedgerError(String),

    /// Every strategy in an ordered fallback list failed.
    #[error("all strategies failed for {operation}: {failures:?}")]
    AllStrategiesFailed {
        operation: String,
        failures: Vec<String>,
    },

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] sealbox_core::CoreError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
