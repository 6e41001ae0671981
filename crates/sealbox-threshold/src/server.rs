//! Key-server protocol.
//!
//! Every server in the cluster is independent: it holds its own
//! wrapping secret and its own view of registry state, and it
//! re-validates entitlement on every share request. The client cannot
//! shortcut any of it by holding ciphertext.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sealbox_core::{Ed25519Signature, ObjectId};
use sealbox_registry::{Ledger, RegistryCall};
use sealbox_session::{ApprovalPayload, SessionCertificate, SessionError};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::{Result, ThresholdError};
use crate::object::ServerShare;
use crate::shares::KeyShare;
use crate::wrap::unwrap_share;

/// A request for one server's share of a document key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSharesRequest {
    /// The wrapped share addressed to this server, lifted out of the
    /// encrypted object.
    pub wrapped: ServerShare,

    /// The simulation-only entitlement proof.
    pub approval: ApprovalPayload,

    /// The requester's session certificate.
    pub certificate: SessionCertificate,

    /// Session-key signature over the approval payload bytes.
    pub request_signature: Ed25519Signature,
}

/// A released share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareResponse {
    /// Which server released it.
    pub server_id: ObjectId,

    /// The unwrapped Shamir share.
    pub share: KeyShare,
}

/// One independent key server.
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// This server's ledger object id.
    fn server_id(&self) -> ObjectId;

    /// The X25519 public key shares are wrapped to.
    fn wrapping_public_key(&self) -> X25519PublicKey;

    /// Validate entitlement and, only then, release this server's share.
    async fn fetch_share(&self, request: FetchSharesRequest, now_ms: i64)
        -> Result<ShareResponse>;
}

/// In-process key server used by tests and the simulated cluster.
///
/// Holds a wrapping secret and a ledger handle (its own registry view).
/// The `offline` flag makes the server fail at the transport level so
/// quorum-shortfall paths are testable.
pub struct MemoryKeyServer {
    id: ObjectId,
    secret: X25519StaticSecret,
    ledger: Arc<dyn Ledger>,
    offline: AtomicBool,
}

impl MemoryKeyServer {
    /// Create a server with a fresh wrapping secret.
    pub fn new(id: ObjectId, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            id,
            secret: X25519StaticSecret::generate(),
            ledger,
            offline: AtomicBool::new(false),
        }
    }

    /// Take the server off the network (transport failures) or bring it
    /// back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyServer for MemoryKeyServer {
    fn server_id(&self) -> ObjectId {
        self.id
    }

    fn wrapping_public_key(&self) -> X25519PublicKey {
        self.secret.public_key()
    }

    async fn fetch_share(
        &self,
        request: FetchSharesRequest,
        now_ms: i64,
    ) -> Result<ShareResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ThresholdError::TransportError(format!(
                "server {} unreachable",
                self.id
            )));
        }

        // 1. The session certificate must verify on its own.
        request.certificate.verify(now_ms).map_err(|e| match e {
            SessionError::SessionExpired { .. } => ThresholdError::SessionExpired,
            other => ThresholdError::SessionError(other),
        })?;

        // 2. The request must be signed by the session key.
        request
            .certificate
            .verify_request(&request.approval.bytes, &request.request_signature)?;

        // 3. Identity binding: the proof's declared sender must be the
        //    session owner. A forged sender cannot borrow someone
        //    else's entitlement.
        if request.approval.sender != request.certificate.owner {
            return Err(ThresholdError::InvalidProof(
                "approval sender does not match session owner".into(),
            ));
        }

        // 4. Evaluate the approval against this server's registry view,
        //    in simulation mode.
        let verdict = self
            .ledger
            .inspect(
                request.approval.sender,
                RegistryCall::Approve {
                    group_id: request.approval.group_id,
                    identifier: request.approval.document_id.clone(),
                },
            )
            .await?;
        if !verdict.is_approved() {
            tracing::debug!(
                server = %self.id,
                sender = %request.approval.sender,
                "approval denied"
            );
            return Err(ThresholdError::InvalidProof(format!(
                "registry denied {} for {:?}",
                request.approval.sender, request.approval.document_id
            )));
        }

        // 5. Only now release the share.
        let share = unwrap_share(&request.wrapped, &self.secret, &request.approval.document_id)?;
        Ok(ShareResponse {
            server_id: self.id,
            share,
        })
    }
}
