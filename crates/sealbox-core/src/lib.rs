//! # Sealbox Core
//!
//! Pure primitives for Sealbox: ledger identifiers, principal addresses,
//! and document identity derivation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`ObjectId`] - 32-byte ledger object identifier (groups, capabilities, key servers)
//! - [`Address`] - Principal address, derived from a primary public key
//! - [`Namespace`] - The byte prefix owned by an access group
//! - [`DocumentId`] - Namespace-prefixed identity string a document is encrypted under
//!
//! ## Identity Derivation
//!
//! A document identifier is `namespace ++ salt`. The identifier must be
//! fixed *before* encryption: it becomes part of the ciphertext's
//! cryptographic identity and cannot be renegotiated without
//! re-encrypting. See [`identity`].

pub mod crypto;
pub mod error;
pub mod identity;
pub mod types;

pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use identity::{derive_deterministic, derive_random, DocumentId, Namespace, Salt, SALT_LEN};
pub use types::{Address, BlobId, ObjectId};
