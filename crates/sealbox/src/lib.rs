//! # Sealbox
//!
//! Seal documents so that only principals enrolled in a ledger-gated
//! access group can open them.
//!
//! ## How it fits together
//!
//! - `sealbox-core`: identifiers, addresses, identity derivation
//! - `sealbox-registry`: access groups, admin capabilities, the ledger
//!   seam with simulation-mode approval checks
//! - `sealbox-session`: time-boxed session keys and approval intents
//! - `sealbox-threshold`: t-of-n encryption against independent key
//!   servers
//! - `sealbox-blob`: content-addressed ciphertext transport
//!
//! This crate is the facade: [`SealboxClient`] wires the seams together
//! and exposes the producer flow (create group, enroll, seal, upload,
//! publish) and the consumer flow (download, bind session, approve,
//! open).
//!
//! ## Example shape
//!
//! ```rust,ignore
//! let client = SealboxClient::new(ledger, blob_store, key_servers, config, clock);
//!
//! // Producer
//! let (group, cap) = client.create_group(admin, "deal-42", "contract-42").await?;
//! client.enroll_members(admin, group.id, cap.id, &members).await?;
//! let sealed = client
//!     .seal_document(admin, &group, &cap, pdf_bytes, SaltMode::Random, None)
//!     .await?;
//!
//! // Consumer
//! let mut session = client.create_session(primary_public_key);
//! let signature = external_signer.sign(&session.binding_message());
//! client.bind_session(&mut session, &signature)?;
//! let plaintext = client
//!     .unseal_document(&sealed.blob_id, group.id, &session)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{SaltMode, SealboxClient, SealedDocument};
pub use config::{ClientConfig, Clock, SystemClock};
pub use error::{Result, SealboxError};

// The seams, re-exported so applications can wire real collaborators.
pub use sealbox_blob::{BlobStore, MemoryBlobStore, SqliteBlobStore, StoreOptions};
pub use sealbox_core::{Address, BlobId, DocumentId, Keypair, ObjectId};
pub use sealbox_registry::{AccessGroup, AdminCapability, Ledger, MemoryLedger};
pub use sealbox_session::{SessionKey, SignatureInput};
pub use sealbox_threshold::{KeyServer, MemoryKeyServer};
