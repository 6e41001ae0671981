//! Client configuration.
//!
//! Everything the client needs is constructed once and passed in; no
//! component reads environment variables or other ambient global state.

use std::time::Duration;

use sealbox_blob::{RetryPolicy, StoreOptions};
use sealbox_core::ObjectId;
use sealbox_threshold::GatewayConfig;

/// A time source.
///
/// Passed in explicitly so expiry behavior is testable; production code
/// uses [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Configuration for a [`SealboxClient`](crate::client::SealboxClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The registry package / authorization scope sessions are bound
    /// to and approvals are evaluated against.
    pub scope_id: ObjectId,

    /// Threshold used when sealing, unless overridden per call.
    pub default_threshold: u8,

    /// Session lifetime in minutes.
    pub session_ttl_min: u32,

    /// Blob store parameters for uploaded ciphertext.
    pub store_options: StoreOptions,

    /// Retry policy for blob I/O.
    pub retry: RetryPolicy,

    /// Key-server gateway settings.
    pub gateway: GatewayConfig,
}

impl ClientConfig {
    /// Sensible defaults for a given scope.
    pub fn new(scope_id: ObjectId) -> Self {
        Self {
            scope_id,
            default_threshold: 2,
            session_ttl_min: 10,
            store_options: StoreOptions::default(),
            retry: RetryPolicy::default(),
            gateway: GatewayConfig {
                request_timeout: Duration::from_secs(10),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000); // sanity: after Sep 2020
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(ObjectId::from_bytes([0x01; 32]));
        assert_eq!(config.default_threshold, 2);
        assert_eq!(config.session_ttl_min, 10);
        assert!(!config.store_options.deletable);
    }
}
