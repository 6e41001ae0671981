//! # Sealbox Blob
//!
//! Content-addressed storage for ciphertext transport.
//!
//! ## Overview
//!
//! A blob id is a pure function of the stored bytes plus the store
//! parameters, so uploading identical content twice is recognized as
//! the "already certified" case and returns the same id instead of
//! creating a duplicate. Retention is epoch-based: a blob stored for
//! `retention_epochs` stops resolving once that window lapses.
//!
//! ## Backends
//!
//! [`MemoryBlobStore`] (tests, simulation) and [`SqliteBlobStore`]
//! (persistent) implement the same [`BlobStore`] trait with identical
//! semantics.
//!
//! ## Gateway
//!
//! [`BlobGateway`] wraps a store with the caller-facing policy: bounded
//! retries with backoff on transport errors only (`NotFound` is
//! terminal), and a digest check on download.

pub mod error;
pub mod gateway;
pub mod store;

pub use error::{BlobError, Result};
pub use gateway::{BlobGateway, RetryPolicy};
pub use store::{BlobMetadata, BlobStore, MemoryBlobStore, PutOutcome, SqliteBlobStore, StoreOptions};
