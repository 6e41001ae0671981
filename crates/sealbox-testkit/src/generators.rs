//! Proptest strategies for Sealbox types.

use proptest::prelude::*;

use sealbox_core::Address;

/// Arbitrary principal addresses.
pub fn address_strategy() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// Valid `(threshold, server_count)` pairs with `1 <= t <= n <= 7`.
pub fn threshold_pair_strategy() -> impl Strategy<Value = (u8, u8)> {
    (1u8..=7).prop_flat_map(|n| (1u8..=n, Just(n)))
}

/// Document payloads from empty up to a few kilobytes.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..4096)
}

/// Member sets with no duplicate addresses.
pub fn member_set_strategy(max: usize) -> impl Strategy<Value = Vec<Address>> {
    proptest::collection::btree_set(any::<[u8; 32]>(), 1..=max)
        .prop_map(|set| set.into_iter().map(Address::from_bytes).collect())
}
