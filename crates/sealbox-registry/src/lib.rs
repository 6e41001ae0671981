//! # Sealbox Registry
//!
//! The access-control registry: ledger-hosted groups of authorized
//! principals, mutated only through a bound admin capability.
//!
//! ## Overview
//!
//! An [`AccessGroup`] owns a namespace (its own object id). Documents
//! encrypted under identifiers carrying that namespace prefix are
//! decryptable exactly by the group's current members. Every mutation
//! requires the [`AdminCapability`] minted when the group was created;
//! the capability check is centralized in one guard so every entry point
//! rejects a foreign capability the same way.
//!
//! ## The ledger seam
//!
//! The registry lives on a ledger external to this process. [`Ledger`]
//! abstracts the transaction interface: `execute` commits a mutation,
//! `inspect` evaluates a call in simulation mode without touching state.
//! Key servers use `inspect` to re-validate approval payloads against
//! their own view of registry state. [`MemoryLedger`] is the in-process
//! implementation used by tests and the simulated key-server cluster.

pub mod contract;
pub mod error;
pub mod fallback;
pub mod group;
pub mod ledger;

pub use contract::approve;
pub use error::{RegistryError, Result};
pub use fallback::{run_strategies, StrategyOutcome};
pub use group::{AccessGroup, AdminCapability};
pub use ledger::{CallOutcome, Ledger, MemoryLedger, RegistryCall};
