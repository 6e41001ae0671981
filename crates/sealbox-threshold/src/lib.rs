//! # Sealbox Threshold
//!
//! Threshold encryption against a cluster of independent key servers.
//!
//! ## Encryption model
//!
//! Sealing uses a three-layer key model:
//!
//! 1. **Content key**: a symmetric key (ChaCha20-Poly1305) encrypts the
//!    document once, with the document identifier as associated data.
//! 2. **Shares**: the content key is split t-of-n over GF(256); no
//!    single key server ever holds the whole key.
//! 3. **Wrapping**: each share is wrapped to one server's X25519 public
//!    key via ephemeral ECDH, so only that server can release it.
//!
//! The resulting [`EncryptedObject`] is self-describing: it embeds the
//! identity, threshold, and server set, so decryption needs nothing
//! beyond the object, a bound session, and an approval payload.
//!
//! ## Decryption model
//!
//! [`ThresholdGateway::decrypt`] fans key-share requests out to every
//! embedded server in parallel and returns as soon as `t` distinct
//! servers have released valid shares. Each server independently
//! re-validates the session certificate and evaluates the approval
//! payload against its *own* view of registry state before releasing
//! anything. Holding ciphertext alone buys the client nothing.

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod object;
pub mod server;
pub mod shares;
pub mod wrap;

pub use crypto::{ContentKey, EncryptionNonce, X25519PublicKey, X25519StaticSecret};
pub use envelope::Envelope;
pub use error::{Result, ThresholdError};
pub use gateway::{GatewayConfig, ThresholdGateway};
pub use object::{EncryptedObject, ServerShare, OBJECT_VERSION};
pub use server::{FetchSharesRequest, KeyServer, MemoryKeyServer, ShareResponse};
pub use shares::KeyShare;
