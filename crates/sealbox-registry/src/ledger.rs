//! Ledger seam: the transaction interface the registry contract lives
//! behind.
//!
//! `execute` commits a mutation; `inspect` evaluates a call in
//! simulation mode: no state change, no fee, no durable record. Key
//! servers only ever `inspect`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use sealbox_core::{Address, BlobId, DocumentId, ObjectId};

use crate::contract;
use crate::error::{RegistryError, Result};
use crate::group::{AccessGroup, AdminCapability};

/// A transaction-shaped registry call.
///
/// One variant per contract entry point. Mutating variants carry the
/// capability id; the ledger resolves and checks the binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryCall {
    /// Create a group and mint its admin capability.
    CreateGroup {
        name: String,
        correlation_id: String,
    },
    /// Enroll one principal.
    AddMember {
        group_id: ObjectId,
        cap_id: ObjectId,
        address: Address,
    },
    /// Enroll a batch of principals in one transaction.
    AddMembers {
        group_id: ObjectId,
        cap_id: ObjectId,
        addresses: Vec<Address>,
    },
    /// Remove one principal (idempotent).
    RemoveMember {
        group_id: ObjectId,
        cap_id: ObjectId,
        address: Address,
    },
    /// Attach a blob reference for discoverability.
    PublishBlobReference {
        group_id: ObjectId,
        cap_id: ObjectId,
        blob_id: BlobId,
    },
    /// The approval check. Only meaningful under `inspect`; the declared
    /// sender is the requester whose entitlement is being proven.
    Approve {
        group_id: ObjectId,
        identifier: DocumentId,
    },
}

impl RegistryCall {
    /// Serialize to the CBOR wire form a remote ledger transport would
    /// submit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .map_err(|e| RegistryError::LedgerError(format!("malformed call: {e}")))
    }
}

/// Result of executing or inspecting a registry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// A group was created.
    Created {
        group: AccessGroup,
        capability: AdminCapability,
    },
    /// A mutation applied.
    Applied,
    /// An approval check evaluated.
    Approval(bool),
}

impl CallOutcome {
    /// Extract an approval verdict, treating anything else as denied.
    pub fn is_approved(&self) -> bool {
        matches!(self, CallOutcome::Approval(true))
    }
}

/// The ledger's transaction interface.
///
/// Implementations must apply each `execute` atomically: a failed call
/// leaves no partial state. Mutations on the *same group* must be
/// serialized by the caller; no optimistic-concurrency token is
/// exposed, so concurrent mutations risk lost updates. Concurrent
/// `inspect` reads are safe and unbounded.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Commit a call to the ledger.
    async fn execute(&self, sender: Address, call: RegistryCall) -> Result<CallOutcome>;

    /// Evaluate a call in simulation mode against current state.
    ///
    /// Must not change state. The declared sender is part of what is
    /// being evaluated (for `Approve`, it is the requester).
    async fn inspect(&self, sender: Address, call: RegistryCall) -> Result<CallOutcome>;

    /// Read a group's current state.
    async fn get_group(&self, id: &ObjectId) -> Result<Option<AccessGroup>>;
}

/// In-process ledger holding registry state behind an `RwLock`.
///
/// Transactions apply atomically; `inspect` evaluates against current
/// state with zero side effects. This is the implementation tests and
/// the simulated key-server cluster share.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

struct MemoryLedgerInner {
    groups: HashMap<ObjectId, AccessGroup>,
    capabilities: HashMap<ObjectId, AdminCapability>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                groups: HashMap::new(),
                capabilities: HashMap::new(),
            }),
        }
    }

    fn fresh_id() -> ObjectId {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        ObjectId::from_bytes(bytes)
    }

    fn resolve_capability(
        inner: &MemoryLedgerInner,
        group_id: &ObjectId,
        cap_id: &ObjectId,
    ) -> Result<AdminCapability> {
        // An unknown capability id is indistinguishable from a foreign
        // one; both reject as InvalidCapability.
        inner
            .capabilities
            .get(cap_id)
            .copied()
            .ok_or(RegistryError::InvalidCapability { group_id: *group_id })
    }

    fn apply(inner: &mut MemoryLedgerInner, call: RegistryCall) -> Result<CallOutcome> {
        match call {
            RegistryCall::CreateGroup {
                name,
                correlation_id,
            } => {
                let group = AccessGroup::new(Self::fresh_id(), name, correlation_id);
                let capability = AdminCapability {
                    id: Self::fresh_id(),
                    group_id: group.id,
                };
                inner.groups.insert(group.id, group.clone());
                inner.capabilities.insert(capability.id, capability);
                Ok(CallOutcome::Created { group, capability })
            }
            RegistryCall::AddMember {
                group_id,
                cap_id,
                address,
            } => {
                let cap = Self::resolve_capability(inner, &group_id, &cap_id)?;
                let group = inner
                    .groups
                    .get_mut(&group_id)
                    .ok_or(RegistryError::GroupNotFound(group_id))?;
                contract::add_member(group, &cap, address)?;
                Ok(CallOutcome::Applied)
            }
            RegistryCall::AddMembers {
                group_id,
                cap_id,
                addresses,
            } => {
                let cap = Self::resolve_capability(inner, &group_id, &cap_id)?;
                let group = inner
                    .groups
                    .get_mut(&group_id)
                    .ok_or(RegistryError::GroupNotFound(group_id))?;
                contract::add_members(group, &cap, &addresses)?;
                Ok(CallOutcome::Applied)
            }
            RegistryCall::RemoveMember {
                group_id,
                cap_id,
                address,
            } => {
                let cap = Self::resolve_capability(inner, &group_id, &cap_id)?;
                let group = inner
                    .groups
                    .get_mut(&group_id)
                    .ok_or(RegistryError::GroupNotFound(group_id))?;
                contract::remove_member(group, &cap, address)?;
                Ok(CallOutcome::Applied)
            }
            RegistryCall::PublishBlobReference {
                group_id,
                cap_id,
                blob_id,
            } => {
                let cap = Self::resolve_capability(inner, &group_id, &cap_id)?;
                let group = inner
                    .groups
                    .get_mut(&group_id)
                    .ok_or(RegistryError::GroupNotFound(group_id))?;
                contract::publish_blob_reference(group, &cap, blob_id)?;
                Ok(CallOutcome::Applied)
            }
            RegistryCall::Approve { .. } => Err(RegistryError::LedgerError(
                "approve is simulation-only; use inspect".into(),
            )),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn execute(&self, _sender: Address, call: RegistryCall) -> Result<CallOutcome> {
        // Atomicity: apply works on a clone and swaps in only on success.
        let mut inner = self.inner.write().unwrap();
        let mut staged = MemoryLedgerInner {
            groups: inner.groups.clone(),
            capabilities: inner.capabilities.clone(),
        };
        let outcome = Self::apply(&mut staged, call)?;
        *inner = staged;
        Ok(outcome)
    }

    async fn inspect(&self, sender: Address, call: RegistryCall) -> Result<CallOutcome> {
        let inner = self.inner.read().unwrap();
        match call {
            RegistryCall::Approve {
                group_id,
                identifier,
            } => {
                let group = inner
                    .groups
                    .get(&group_id)
                    .ok_or(RegistryError::GroupNotFound(group_id))?;
                Ok(CallOutcome::Approval(contract::approve(
                    &identifier,
                    group,
                    &sender,
                )))
            }
            // Mutations can be dry-run too: evaluate against a throwaway
            // copy of state.
            other => {
                let mut staged = MemoryLedgerInner {
                    groups: inner.groups.clone(),
                    capabilities: inner.capabilities.clone(),
                };
                Self::apply(&mut staged, other)
            }
        }
    }

    async fn get_group(&self, id: &ObjectId) -> Result<Option<AccessGroup>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.groups.get(id).cloned())
    }
}
