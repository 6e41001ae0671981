//! Approval intents.
//!
//! An approval intent is a transaction-shaped payload that invokes the
//! registry's approve check, but only ever in simulation mode: no ledger
//! state changes, no fee, no durable record. The payload's declared
//! sender must equal the requesting address: a forged sender cannot
//! borrow someone else's entitlement, because key servers compare the
//! sender against the session certificate's owner before evaluating.

use serde::{Deserialize, Serialize};

use sealbox_core::{Address, DocumentId, ObjectId};

use crate::error::{Result, SessionError};

/// Builder for an approval payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalIntent {
    /// The registry package / scope to invoke.
    pub registry_id: ObjectId,
    /// The group whose membership is checked.
    pub group_id: ObjectId,
    /// The identifier the requester wants keys for.
    pub document_id: DocumentId,
    /// The requester. Must match the session certificate owner.
    pub sender: Address,
}

impl ApprovalIntent {
    /// Start an intent for one (registry, group, identifier, requester).
    pub fn new(
        registry_id: ObjectId,
        group_id: ObjectId,
        document_id: DocumentId,
        sender: Address,
    ) -> Self {
        Self {
            registry_id,
            group_id,
            document_id,
            sender,
        }
    }

    /// Build the simulation-only payload.
    pub fn build(&self) -> Result<ApprovalPayload> {
        let body = PayloadBody {
            version: APPROVAL_VERSION,
            registry_id: &self.registry_id,
            group_id: &self.group_id,
            document_id: &self.document_id,
        };
        let mut bytes = Vec::new();
        ciborium::into_writer(&body, &mut bytes)
            .map_err(|e| SessionError::SerializationError(e.to_string()))?;

        Ok(ApprovalPayload {
            sender: self.sender,
            group_id: self.group_id,
            document_id: self.document_id.clone(),
            bytes,
        })
    }
}

const APPROVAL_VERSION: u8 = 0;

#[derive(Serialize)]
struct PayloadBody<'a> {
    version: u8,
    registry_id: &'a ObjectId,
    group_id: &'a ObjectId,
    document_id: &'a DocumentId,
}

/// The built, simulation-only approval payload.
///
/// Opaque to the client: only key servers evaluate it, each against its
/// own view of registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPayload {
    /// Declared sender; the entitlement being proven is theirs.
    pub sender: Address,
    /// Target group.
    pub group_id: ObjectId,
    /// Target identifier.
    pub document_id: DocumentId,
    /// Canonical transaction-kind bytes (what the session key signs).
    pub bytes: Vec<u8>,
}
