//! Access groups and admin capabilities.
//!
//! A group is created once, together with exactly one capability bound
//! to it. There is no teardown: groups move from uninitialized to active
//! and stay active for their lifetime.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sealbox_core::{Address, BlobId, Namespace, ObjectId};

/// A ledger-hosted set of principals authorized for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroup {
    /// The group's object id. Doubles as its namespace.
    pub id: ObjectId,

    /// Human-readable display name.
    pub name: String,

    /// Caller-supplied correlation id linking the group to an external
    /// record (a contract, a dossier). Not interpreted by the registry.
    pub correlation_id: String,

    /// The authorized principals. Order is irrelevant; membership is
    /// set-semantics.
    pub members: BTreeSet<Address>,

    /// Blob references published under this group for discoverability.
    /// Publishing grants nothing: decryption rights come from membership
    /// plus the identifier's namespace prefix alone.
    pub published_blobs: BTreeSet<BlobId>,
}

impl AccessGroup {
    /// Create a new active group with an empty member set.
    pub fn new(id: ObjectId, name: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            correlation_id: correlation_id.into(),
            members: BTreeSet::new(),
            published_blobs: BTreeSet::new(),
        }
    }

    /// The namespace this group owns: its own id bytes.
    pub fn namespace(&self) -> Namespace {
        Namespace::from(self.id)
    }

    /// Whether an address is currently enrolled.
    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains(address)
    }
}

/// Unforgeable token proving mutation rights over exactly one group.
///
/// Minted once at group creation; `group_id` is the binding. Any
/// mutating registry call presenting a capability whose `group_id`
/// differs from the target group is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCapability {
    /// The capability's own object id.
    pub id: ObjectId,

    /// The group this capability administers.
    pub group_id: ObjectId,
}

impl AdminCapability {
    /// Whether this capability administers the given group.
    pub fn administers(&self, group: &AccessGroup) -> bool {
        self.group_id == group.id
    }
}
