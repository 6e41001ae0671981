//! # Sealbox Testkit
//!
//! Testing utilities for Sealbox.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a fully wired simulated deployment (shared ledger,
//!   key-server cluster, blob store, manual clock) plus principal
//!   minting and non-interactive session binding
//! - **Generators**: proptest strategies for addresses, thresholds, and
//!   payloads
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use sealbox_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let client = fixture.client();
//! let alice = fixture.mint_principal();
//! let session = fixture.bound_session(&client, &alice);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{ManualClock, TestFixture, TestPrincipal};
pub use generators::{
    address_strategy, member_set_strategy, payload_strategy, threshold_pair_strategy,
};
