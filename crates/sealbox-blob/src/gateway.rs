//! Caller-facing blob gateway.
//!
//! Wraps a [`BlobStore`] with the retry policy: transport errors are
//! retried a bounded number of times with exponential backoff,
//! `NotFound` is terminal and surfaces immediately. Downloads verify
//! that the returned bytes hash back to the requested id.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use sealbox_core::BlobId;

use crate::error::{BlobError, Result};
use crate::store::{blob_id_for, BlobStore, PutOutcome, StoreOptions};

/// Bounded-retry policy for transport errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        // attempt is 1-based; first retry waits base_delay.
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Gateway over a blob store backend.
pub struct BlobGateway {
    store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
}

impl BlobGateway {
    /// Create a gateway with the given policy.
    pub fn new(store: Arc<dyn BlobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                // Only transport errors are retryable; everything else
                // (NotFound, NotDeletable, storage corruption) is
                // terminal.
                Err(err @ BlobError::TransportError(_)) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(BlobError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(operation, attempt, ?delay, %err, "retrying after transport error");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Upload bytes; returns the content address.
    pub async fn upload(&self, bytes: &[u8], options: StoreOptions) -> Result<PutOutcome> {
        let outcome = self
            .with_retries("upload", || self.store.put(bytes, options))
            .await?;
        tracing::debug!(blob = %outcome.blob_id(), size = bytes.len(), "blob uploaded");
        Ok(outcome)
    }

    /// Download a blob and verify its digest.
    ///
    /// The blob id is recomputed from the returned bytes under both
    /// parameter shapes; a mismatch means the store returned corrupt or
    /// substituted content.
    pub async fn download(&self, id: &BlobId) -> Result<Bytes> {
        let bytes = self.with_retries("download", || self.store.get(id)).await?;

        let meta = self.store.head(id).await?;
        if let Some(meta) = meta {
            let options = StoreOptions {
                retention_epochs: meta.retention_epochs,
                deletable: meta.deletable,
            };
            if blob_id_for(&bytes, &options) != *id {
                return Err(BlobError::DigestMismatch(*id));
            }
        }
        Ok(bytes)
    }

    /// Metadata-only existence probe.
    pub async fn exists(&self, id: &BlobId) -> Result<bool> {
        let meta = self.with_retries("head", || self.store.head(id)).await?;
        Ok(meta.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    /// Fails the first `failures` calls of every operation with a
    /// transport error, then delegates.
    struct FlakyStore {
        inner: MemoryBlobStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryBlobStore::new(),
                failures: AtomicU32::new(failures),
            }
        }

        fn maybe_fail(&self) -> Result<()> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(BlobError::TransportError("flaky".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn put(&self, bytes: &[u8], options: StoreOptions) -> Result<PutOutcome> {
            self.maybe_fail()?;
            self.inner.put(bytes, options).await
        }

        async fn get(&self, id: &BlobId) -> Result<Bytes> {
            self.maybe_fail()?;
            self.inner.get(id).await
        }

        async fn head(&self, id: &BlobId) -> Result<Option<crate::store::BlobMetadata>> {
            self.inner.head(id).await
        }

        async fn delete(&self, id: &BlobId) -> Result<()> {
            self.inner.delete(id).await
        }

        async fn advance_epoch(&self) -> Result<u64> {
            self.inner.advance_epoch().await
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let gateway = BlobGateway::new(Arc::new(MemoryBlobStore::new()), RetryPolicy::default());
        let outcome = gateway
            .upload(b"ciphertext", StoreOptions::default())
            .await
            .unwrap();

        let bytes = gateway.download(&outcome.blob_id()).await.unwrap();
        assert_eq!(bytes.as_ref(), b"ciphertext");
        assert!(gateway.exists(&outcome.blob_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        // Two failures, three attempts: succeeds on the last.
        let gateway = BlobGateway::new(Arc::new(FlakyStore::new(2)), fast_retry());
        let outcome = gateway
            .upload(b"eventually", StoreOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, PutOutcome::NewlyStored(_)));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let gateway = BlobGateway::new(Arc::new(FlakyStore::new(10)), fast_retry());
        let err = gateway
            .upload(b"never", StoreOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlobError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_never_retried() {
        let flaky = Arc::new(FlakyStore::new(0));
        let gateway = BlobGateway::new(Arc::clone(&flaky) as Arc<dyn BlobStore>, fast_retry());

        let missing = BlobId::from_bytes([0x77; 32]);
        let err = gateway.download(&missing).await.unwrap_err();
        // Terminal immediately, not wrapped in RetriesExhausted.
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_downloaded_digest_matches_preupload() {
        let gateway = BlobGateway::new(Arc::new(MemoryBlobStore::new()), RetryPolicy::default());
        let content = b"digest checked bytes";
        let pre_digest = blake3::hash(content);

        let id = gateway
            .upload(content, StoreOptions::default())
            .await
            .unwrap()
            .blob_id();
        let bytes = gateway.download(&id).await.unwrap();
        assert_eq!(blake3::hash(&bytes), pre_digest);
    }
}
