//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a simulated deployment with
//! one shared registry ledger, a key-server cluster, an in-memory blob
//! store, and a clock the test controls.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use sealbox::{ClientConfig, Clock, SealboxClient};
use sealbox_blob::MemoryBlobStore;
use sealbox_core::{Address, Keypair, ObjectId};
use sealbox_registry::{Ledger, MemoryLedger};
use sealbox_session::SessionKey;
use sealbox_threshold::{KeyServer, MemoryKeyServer};

/// A settable, advanceable time source.
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Start at time zero.
    pub fn new() -> Self {
        Self {
            now_ms: AtomicI64::new(0),
        }
    }

    /// Jump to an absolute time.
    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Advance by a delta.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Advance by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1_000);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A principal with a primary credential.
pub struct TestPrincipal {
    /// The primary keypair (the external signer, in production).
    pub keypair: Keypair,
}

impl TestPrincipal {
    /// The principal's address.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Produce the binding signature an external signer would.
    pub fn sign_binding(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message).as_bytes().to_vec()
    }
}

/// A fully wired simulated deployment.
pub struct TestFixture {
    /// The registry ledger all parties share.
    pub ledger: Arc<MemoryLedger>,
    /// The key-server cluster. Each server holds the same ledger handle
    /// but validates independently.
    pub servers: Vec<Arc<MemoryKeyServer>>,
    /// Ciphertext transport.
    pub blob_store: Arc<MemoryBlobStore>,
    /// Test-controlled time.
    pub clock: Arc<ManualClock>,
    /// The authorization scope.
    pub scope_id: ObjectId,
}

impl TestFixture {
    /// A three-server deployment.
    pub fn new() -> Self {
        Self::with_servers(3)
    }

    /// A deployment with `n` key servers.
    pub fn with_servers(n: u8) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let servers = (1..=n)
            .map(|i| {
                Arc::new(MemoryKeyServer::new(
                    ObjectId::from_bytes([i; 32]),
                    Arc::clone(&ledger) as Arc<dyn Ledger>,
                ))
            })
            .collect();

        Self {
            ledger,
            servers,
            blob_store: Arc::new(MemoryBlobStore::new()),
            clock: Arc::new(ManualClock::new()),
            scope_id: ObjectId::from_bytes([0x5c; 32]),
        }
    }

    /// Default client configuration for this deployment.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.scope_id)
    }

    /// Build a client over the fixture's collaborators.
    pub fn client(&self) -> SealboxClient {
        self.client_with_config(self.config())
    }

    /// Build a client with a customized configuration.
    pub fn client_with_config(&self, config: ClientConfig) -> SealboxClient {
        SealboxClient::new(
            Arc::clone(&self.ledger) as Arc<dyn Ledger>,
            Arc::clone(&self.blob_store) as Arc<dyn sealbox_blob::BlobStore>,
            self.servers
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn KeyServer>)
                .collect(),
            config,
            Arc::clone(&self.clock) as Arc<dyn Clock>,
        )
    }

    /// Mint a principal with a fresh primary credential.
    pub fn mint_principal(&self) -> TestPrincipal {
        TestPrincipal {
            keypair: Keypair::generate(),
        }
    }

    /// Create and bind a session for a principal, standing in for the
    /// interactive signer.
    pub fn bound_session(&self, client: &SealboxClient, principal: &TestPrincipal) -> SessionKey {
        let mut session = client.create_session(principal.keypair.public_key());
        let signature = principal.sign_binding(&session.binding_message());
        client
            .bind_session(&mut session, &signature)
            .expect("fixture binding should succeed");
        session
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
