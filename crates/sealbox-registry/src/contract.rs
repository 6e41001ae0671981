//! Registry contract entry points.
//!
//! These functions are the contract's mutation and approval logic,
//! executed by a [`Ledger`](crate::ledger::Ledger) implementation. Each
//! mutating entry point starts with the same capability guard.

use sealbox_core::{Address, BlobId, DocumentId};

use crate::error::{RegistryError, Result};
use crate::group::{AccessGroup, AdminCapability};

/// Authorization guard for mutating entry points.
///
/// Every mutation runs this first; a capability bound to any other group
/// is rejected uniformly as `InvalidCapability`.
fn require_capability(group: &AccessGroup, cap: &AdminCapability) -> Result<()> {
    if !cap.administers(group) {
        return Err(RegistryError::InvalidCapability { group_id: group.id });
    }
    Ok(())
}

/// Enroll a principal.
///
/// Fails `DuplicateMember` if the address is already enrolled.
pub fn add_member(group: &mut AccessGroup, cap: &AdminCapability, address: Address) -> Result<()> {
    require_capability(group, cap)?;
    if !group.members.insert(address) {
        return Err(RegistryError::DuplicateMember {
            group_id: group.id,
            address,
        });
    }
    Ok(())
}

/// Enroll a batch of principals in one call.
///
/// The capability is checked once. The batch fails as a whole on the
/// first duplicate, leaving the group unchanged; callers that need
/// partial progress fall back to sequential [`add_member`] calls. The
/// two forms agree on the end state, not on failure semantics.
pub fn add_members(
    group: &mut AccessGroup,
    cap: &AdminCapability,
    addresses: &[Address],
) -> Result<()> {
    require_capability(group, cap)?;
    for address in addresses {
        if group.members.contains(address) {
            return Err(RegistryError::DuplicateMember {
                group_id: group.id,
                address: *address,
            });
        }
    }
    group.members.extend(addresses.iter().copied());
    Ok(())
}

/// Remove a principal. Idempotent: removing an absent address is a
/// no-op, not an error.
///
/// Removal gates *future* approval checks only. Key shares or plaintext
/// the principal obtained while enrolled are not clawed back; callers
/// needing post-removal confidentiality must re-seal the document under
/// a fresh identifier.
pub fn remove_member(
    group: &mut AccessGroup,
    cap: &AdminCapability,
    address: Address,
) -> Result<()> {
    require_capability(group, cap)?;
    group.members.remove(&address);
    Ok(())
}

/// Attach a blob reference to the group for discoverability.
///
/// Grants nothing: decryption rights are controlled purely by membership
/// plus the identifier's namespace prefix, whether or not a blob is
/// published.
pub fn publish_blob_reference(
    group: &mut AccessGroup,
    cap: &AdminCapability,
    blob_id: BlobId,
) -> Result<()> {
    require_capability(group, cap)?;
    group.published_blobs.insert(blob_id);
    Ok(())
}

/// The approval check key servers evaluate in simulation mode.
///
/// Authorized iff the identifier carries the group's namespace prefix
/// AND the requester is a current member. Read-only; safe to evaluate
/// concurrently without bound.
pub fn approve(identifier: &DocumentId, group: &AccessGroup, requester: &Address) -> bool {
    identifier.starts_with(&group.namespace()) && group.is_member(requester)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::{derive_random, ObjectId};

    fn setup() -> (AccessGroup, AdminCapability) {
        let group = AccessGroup::new(ObjectId::from_bytes([0x10; 32]), "g", "c");
        let cap = AdminCapability {
            id: ObjectId::from_bytes([0x11; 32]),
            group_id: group.id,
        };
        (group, cap)
    }

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_add_and_duplicate() {
        let (mut group, cap) = setup();
        add_member(&mut group, &cap, addr(1)).unwrap();
        let err = add_member(&mut group, &cap, addr(1)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMember { .. }));
    }

    #[test]
    fn test_foreign_capability_rejected_everywhere() {
        let (mut group, _) = setup();
        let foreign = AdminCapability {
            id: ObjectId::from_bytes([0x22; 32]),
            group_id: ObjectId::from_bytes([0x23; 32]),
        };

        assert!(matches!(
            add_member(&mut group, &foreign, addr(1)),
            Err(RegistryError::InvalidCapability { .. })
        ));
        assert!(matches!(
            add_members(&mut group, &foreign, &[addr(1)]),
            Err(RegistryError::InvalidCapability { .. })
        ));
        assert!(matches!(
            remove_member(&mut group, &foreign, addr(1)),
            Err(RegistryError::InvalidCapability { .. })
        ));
        assert!(matches!(
            publish_blob_reference(&mut group, &foreign, BlobId::from_bytes([0u8; 32])),
            Err(RegistryError::InvalidCapability { .. })
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut group, cap) = setup();
        add_member(&mut group, &cap, addr(1)).unwrap();
        remove_member(&mut group, &cap, addr(1)).unwrap();
        // Absent address: still Ok.
        remove_member(&mut group, &cap, addr(1)).unwrap();
        assert!(group.members.is_empty());
    }

    #[test]
    fn test_batch_failure_leaves_state_unchanged() {
        let (mut group, cap) = setup();
        add_member(&mut group, &cap, addr(2)).unwrap();

        let err = add_members(&mut group, &cap, &[addr(1), addr(2), addr(3)]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMember { .. }));
        assert_eq!(group.members.len(), 1);
        assert!(group.is_member(&addr(2)));
    }

    #[test]
    fn test_batch_matches_sequential_end_state() {
        let (mut batch_group, cap) = setup();
        let (mut seq_group, _) = setup();

        add_members(&mut batch_group, &cap, &[addr(1), addr(2), addr(3)]).unwrap();
        for a in [addr(3), addr(1), addr(2)] {
            add_member(&mut seq_group, &cap, a).unwrap();
        }
        assert_eq!(batch_group.members, seq_group.members);
    }

    #[test]
    fn test_revocation_denies_future_approvals() {
        let (mut group, cap) = setup();
        let (id, _) = derive_random(&group.namespace());

        add_member(&mut group, &cap, addr(7)).unwrap();
        assert!(approve(&id, &group, &addr(7)));

        remove_member(&mut group, &cap, addr(7)).unwrap();
        assert!(!approve(&id, &group, &addr(7)));
    }

    #[test]
    fn test_namespace_gating_beats_membership() {
        let (mut group, cap) = setup();
        add_member(&mut group, &cap, addr(7)).unwrap();

        let other = AccessGroup::new(ObjectId::from_bytes([0x99; 32]), "o", "c");
        let (foreign_id, _) = derive_random(&other.namespace());

        // Member, but the identifier is not under this group's namespace.
        assert!(!approve(&foreign_id, &group, &addr(7)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_batch_equals_sequential_any_order(
                raw in proptest::collection::btree_set(any::<[u8; 32]>(), 1..8),
                seed in any::<u64>(),
            ) {
                let addresses: Vec<Address> =
                    raw.into_iter().map(Address::from_bytes).collect();

                let mut shuffled = addresses.clone();
                let mut s = seed;
                for i in (1..shuffled.len()).rev() {
                    s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let j = (s % (i as u64 + 1)) as usize;
                    shuffled.swap(i, j);
                }

                let (mut batch_group, cap) = setup();
                let (mut seq_group, _) = setup();

                add_members(&mut batch_group, &cap, &addresses).unwrap();
                for address in shuffled {
                    add_member(&mut seq_group, &cap, address).unwrap();
                }
                prop_assert_eq!(batch_group.members, seq_group.members);
            }
        }
    }

    #[test]
    fn test_publish_does_not_grant() {
        let (mut group, cap) = setup();
        let (id, _) = derive_random(&group.namespace());
        publish_blob_reference(&mut group, &cap, BlobId::from_bytes([0xaa; 32])).unwrap();

        assert!(!approve(&id, &group, &addr(5)));
    }
}
