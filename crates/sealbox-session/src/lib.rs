//! # Sealbox Session
//!
//! Time-boxed session credentials and the approval intents they
//! authorize.
//!
//! ## Overview
//!
//! Decrypting a sealed document means convincing every key server in a
//! quorum that the requester is entitled. Requiring an interactive
//! signature from the primary credential on every key request would be
//! unusable, so entitlement is split in two:
//!
//! - A [`SessionKey`] is an ephemeral keypair bound *once* to the
//!   primary credential via a signature over a canonical binding
//!   message. Until its ttl lapses it can sign any number of key-server
//!   requests.
//! - An [`ApprovalIntent`] is an unsigned, simulation-only payload that
//!   names (registry, identifier, requester). Key servers evaluate it
//!   against live registry state; nothing is ever committed.
//!
//! ## Signature shapes
//!
//! Two binding-signature encodings arrive at the process boundary: raw
//! 64-byte signatures and a JSON wrapper with a `signature` field.
//! [`SignatureInput`] resolves the shape exactly once; everything past
//! the boundary works with a normalized signature.

pub mod approval;
pub mod error;
pub mod session;
pub mod signature;

pub use approval::{ApprovalIntent, ApprovalPayload};
pub use error::{Result, SessionError};
pub use session::{SessionCertificate, SessionKey, SessionState};
pub use signature::SignatureInput;
