//! Blob store backends.
//!
//! One trait, two backends with identical semantics: in-memory for
//! tests and simulation, SQLite for persistence.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use sealbox_core::BlobId;

use crate::error::{BlobError, Result};

/// Upload parameters. Part of the content address: the same bytes
/// stored under different parameters are different blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// How many epochs the blob stays resolvable.
    pub retention_epochs: u32,

    /// Whether the blob may be deleted before its retention lapses.
    pub deletable: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            retention_epochs: 2,
            deletable: false,
        }
    }
}

/// Compute the content address for bytes stored under given options.
pub fn blob_id_for(bytes: &[u8], options: &StoreOptions) -> BlobId {
    let mut hasher = blake3::Hasher::new_derive_key("sealbox-blob-id-v0");
    hasher.update(&options.retention_epochs.to_le_bytes());
    hasher.update(&[u8::from(options.deletable)]);
    hasher.update(bytes);
    BlobId::from_bytes(*hasher.finalize().as_bytes())
}

/// Result of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The bytes were stored for the first time.
    NewlyStored(BlobId),
    /// An identical blob already existed; nothing was written.
    AlreadyCertified(BlobId),
}

impl PutOutcome {
    /// The content address, either way.
    pub fn blob_id(&self) -> BlobId {
        match self {
            PutOutcome::NewlyStored(id) | PutOutcome::AlreadyCertified(id) => *id,
        }
    }
}

/// Metadata returned by a `head` probe. No content is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Content length in bytes.
    pub size: u64,
    /// Epoch the blob was stored in.
    pub stored_epoch: u64,
    /// Retention window in epochs.
    pub retention_epochs: u32,
    /// Whether early deletion is allowed.
    pub deletable: bool,
}

/// The blob store seam.
///
/// Semantics shared by all backends:
/// - `put` is idempotent: identical bytes + identical options yield the
///   same id, and re-uploading reports `AlreadyCertified`.
/// - `get` fails `NotFound` for unknown ids *and* for blobs whose
///   retention window has lapsed.
/// - `head` is a metadata-only probe.
/// - `delete` succeeds only for blobs stored as deletable.
/// - `advance_epoch` moves the store's epoch clock, expiring blobs
///   whose window has closed.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes; returns the content address.
    async fn put(&self, bytes: &[u8], options: StoreOptions) -> Result<PutOutcome>;

    /// Fetch a blob's bytes.
    async fn get(&self, id: &BlobId) -> Result<Bytes>;

    /// Probe for existence and metadata without fetching content.
    async fn head(&self, id: &BlobId) -> Result<Option<BlobMetadata>>;

    /// Delete a deletable blob before expiry.
    async fn delete(&self, id: &BlobId) -> Result<()>;

    /// Advance the epoch clock by one; returns the new epoch.
    async fn advance_epoch(&self) -> Result<u64>;
}

fn expired(meta: &BlobMetadata, epoch: u64) -> bool {
    epoch >= meta.stored_epoch + u64::from(meta.retention_epochs)
}

// ─────────────────────────────────────────────────────────────────────────
// Memory backend
// ─────────────────────────────────────────────────────────────────────────

struct StoredBlob {
    content: Bytes,
    meta: BlobMetadata,
}

struct MemoryBlobStoreInner {
    blobs: HashMap<BlobId, StoredBlob>,
    epoch: u64,
}

/// In-memory blob store. All data is lost on drop.
pub struct MemoryBlobStore {
    inner: RwLock<MemoryBlobStoreInner>,
}

impl MemoryBlobStore {
    /// Create an empty store at epoch 0.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBlobStoreInner {
                blobs: HashMap::new(),
                epoch: 0,
            }),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: &[u8], options: StoreOptions) -> Result<PutOutcome> {
        let id = blob_id_for(bytes, &options);
        let mut inner = self.inner.write().unwrap();
        let epoch = inner.epoch;

        if let Some(existing) = inner.blobs.get(&id) {
            if !expired(&existing.meta, epoch) {
                return Ok(PutOutcome::AlreadyCertified(id));
            }
        }

        inner.blobs.insert(
            id,
            StoredBlob {
                content: Bytes::copy_from_slice(bytes),
                meta: BlobMetadata {
                    size: bytes.len() as u64,
                    stored_epoch: epoch,
                    retention_epochs: options.retention_epochs,
                    deletable: options.deletable,
                },
            },
        );
        Ok(PutOutcome::NewlyStored(id))
    }

    async fn get(&self, id: &BlobId) -> Result<Bytes> {
        let inner = self.inner.read().unwrap();
        match inner.blobs.get(id) {
            Some(blob) if !expired(&blob.meta, inner.epoch) => Ok(blob.content.clone()),
            _ => Err(BlobError::NotFound(*id)),
        }
    }

    async fn head(&self, id: &BlobId) -> Result<Option<BlobMetadata>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .blobs
            .get(id)
            .filter(|blob| !expired(&blob.meta, inner.epoch))
            .map(|blob| blob.meta))
    }

    async fn delete(&self, id: &BlobId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let epoch = inner.epoch;
        let deletable = match inner.blobs.get(id) {
            Some(blob) if !expired(&blob.meta, epoch) => blob.meta.deletable,
            _ => return Err(BlobError::NotFound(*id)),
        };
        if !deletable {
            return Err(BlobError::NotDeletable(*id));
        }
        inner.blobs.remove(id);
        Ok(())
    }

    async fn advance_epoch(&self) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        inner.epoch += 1;
        let epoch = inner.epoch;
        inner.blobs.retain(|_, blob| !expired(&blob.meta, epoch));
        Ok(epoch)
    }
}

// ─────────────────────────────────────────────────────────────────────────
// SQLite backend
// ─────────────────────────────────────────────────────────────────────────

/// SQLite-backed blob store. Thread-safe via internal Mutex.
pub struct SqliteBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBlobStore {
    /// Open (and initialize) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| BlobError::Storage(e.to_string()))?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| BlobError::Storage(e.to_string()))?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                blob_id          BLOB PRIMARY KEY,
                content          BLOB NOT NULL,
                size             INTEGER NOT NULL,
                stored_epoch     INTEGER NOT NULL,
                retention_epochs INTEGER NOT NULL,
                deletable        INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS store_state (
                key   TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO store_state (key, value) VALUES ('epoch', 0);",
        )
        .map_err(|e| BlobError::Storage(e.to_string()))
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| BlobError::Storage(format!("mutex poisoned: {e}")))?;
        f(&conn)
    }

    fn current_epoch(conn: &Connection) -> Result<u64> {
        conn.query_row(
            "SELECT value FROM store_state WHERE key = 'epoch'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|v| v as u64)
        .map_err(|e| BlobError::Storage(e.to_string()))
    }

    fn row_meta(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlobMetadata> {
        Ok(BlobMetadata {
            size: row.get::<_, i64>("size")? as u64,
            stored_epoch: row.get::<_, i64>("stored_epoch")? as u64,
            retention_epochs: row.get::<_, i64>("retention_epochs")? as u32,
            deletable: row.get::<_, i64>("deletable")? != 0,
        })
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, bytes: &[u8], options: StoreOptions) -> Result<PutOutcome> {
        let id = blob_id_for(bytes, &options);
        self.with_conn(|conn| {
            let epoch = Self::current_epoch(conn)?;

            let existing = conn
                .query_row(
                    "SELECT size, stored_epoch, retention_epochs, deletable
                     FROM blobs WHERE blob_id = ?1",
                    params![id.as_bytes().as_slice()],
                    Self::row_meta,
                )
                .optional()
                .map_err(|e| BlobError::Storage(e.to_string()))?;

            if let Some(meta) = existing {
                if !expired(&meta, epoch) {
                    return Ok(PutOutcome::AlreadyCertified(id));
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO blobs
                 (blob_id, content, size, stored_epoch, retention_epochs, deletable)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_bytes().as_slice(),
                    bytes,
                    bytes.len() as i64,
                    epoch as i64,
                    i64::from(options.retention_epochs),
                    i64::from(options.deletable),
                ],
            )
            .map_err(|e| BlobError::Storage(e.to_string()))?;
            Ok(PutOutcome::NewlyStored(id))
        })
    }

    async fn get(&self, id: &BlobId) -> Result<Bytes> {
        self.with_conn(|conn| {
            let epoch = Self::current_epoch(conn)?;
            let row = conn
                .query_row(
                    "SELECT content, size, stored_epoch, retention_epochs, deletable
                     FROM blobs WHERE blob_id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| {
                        let content: Vec<u8> = row.get("content")?;
                        let meta = Self::row_meta(row)?;
                        Ok((content, meta))
                    },
                )
                .optional()
                .map_err(|e| BlobError::Storage(e.to_string()))?;

            match row {
                Some((content, meta)) if !expired(&meta, epoch) => Ok(Bytes::from(content)),
                _ => Err(BlobError::NotFound(*id)),
            }
        })
    }

    async fn head(&self, id: &BlobId) -> Result<Option<BlobMetadata>> {
        self.with_conn(|conn| {
            let epoch = Self::current_epoch(conn)?;
            let meta = conn
                .query_row(
                    "SELECT size, stored_epoch, retention_epochs, deletable
                     FROM blobs WHERE blob_id = ?1",
                    params![id.as_bytes().as_slice()],
                    Self::row_meta,
                )
                .optional()
                .map_err(|e| BlobError::Storage(e.to_string()))?;
            Ok(meta.filter(|m| !expired(m, epoch)))
        })
    }

    async fn delete(&self, id: &BlobId) -> Result<()> {
        self.with_conn(|conn| {
            let epoch = Self::current_epoch(conn)?;
            let meta = conn
                .query_row(
                    "SELECT size, stored_epoch, retention_epochs, deletable
                     FROM blobs WHERE blob_id = ?1",
                    params![id.as_bytes().as_slice()],
                    Self::row_meta,
                )
                .optional()
                .map_err(|e| BlobError::Storage(e.to_string()))?;

            match meta {
                Some(meta) if !expired(&meta, epoch) => {
                    if !meta.deletable {
                        return Err(BlobError::NotDeletable(*id));
                    }
                    conn.execute(
                        "DELETE FROM blobs WHERE blob_id = ?1",
                        params![id.as_bytes().as_slice()],
                    )
                    .map_err(|e| BlobError::Storage(e.to_string()))?;
                    Ok(())
                }
                _ => Err(BlobError::NotFound(*id)),
            }
        })
    }

    async fn advance_epoch(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE store_state SET value = value + 1 WHERE key = 'epoch'",
                [],
            )
            .map_err(|e| BlobError::Storage(e.to_string()))?;
            let epoch = Self::current_epoch(conn)?;
            conn.execute(
                "DELETE FROM blobs WHERE stored_epoch + retention_epochs <= ?1",
                params![epoch as i64],
            )
            .map_err(|e| BlobError::Storage(e.to_string()))?;
            Ok(epoch)
        })
    }
}
