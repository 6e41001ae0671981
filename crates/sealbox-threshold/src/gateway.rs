//! The threshold encryption gateway.
//!
//! Client-side orchestration: sealing produces a self-describing
//! encrypted object; opening fans share requests out to the embedded
//! server set and finishes as soon as a quorum of `t` distinct servers
//! has released valid shares.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use sealbox_core::{DocumentId, ObjectId};
use sealbox_session::{ApprovalPayload, SessionError, SessionKey};

use crate::crypto::ContentKey;
use crate::envelope::Envelope;
use crate::error::{Result, ThresholdError};
use crate::object::{EncryptedObject, OBJECT_VERSION};
use crate::server::{FetchSharesRequest, KeyServer};
use crate::shares::{combine, split, KeyShare};
use crate::wrap::wrap_share;

/// Gateway configuration. Constructed once, passed in.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deadline applied to each key-server call so an unreachable
    /// server cannot block the quorum indefinitely.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Client gateway over a set of independent key servers.
pub struct ThresholdGateway {
    servers: Vec<Arc<dyn KeyServer>>,
    config: GatewayConfig,
}

impl ThresholdGateway {
    /// Create a gateway over the given server set.
    pub fn new(servers: Vec<Arc<dyn KeyServer>>, config: GatewayConfig) -> Self {
        Self { servers, config }
    }

    /// The configured server set's ids.
    pub fn server_ids(&self) -> Vec<ObjectId> {
        self.servers.iter().map(|s| s.server_id()).collect()
    }

    /// Seal a document under an identity.
    ///
    /// The identifier must already be fixed: it is baked into the
    /// envelope's associated data and into every wrapped share, so it
    /// cannot be renegotiated without re-encrypting.
    ///
    /// Returns the self-describing object plus the raw content key as a
    /// local backup; callers that do not want a bypass path discard it.
    pub fn encrypt(
        &self,
        scope_id: ObjectId,
        document_id: &DocumentId,
        plaintext: &[u8],
        threshold: u8,
    ) -> Result<(EncryptedObject, ContentKey)> {
        let n = self.servers.len();
        if threshold == 0 || usize::from(threshold) > n || n > 255 {
            return Err(ThresholdError::InvalidThreshold {
                threshold,
                servers: n,
            });
        }

        let content_key = ContentKey::generate();
        let envelope = Envelope::seal(plaintext, &content_key, document_id)?;
        let raw_shares = split(&content_key, threshold, n)?;

        let mut shares = Vec::with_capacity(n);
        for (server, share) in self.servers.iter().zip(raw_shares.iter()) {
            shares.push(wrap_share(
                server.server_id(),
                share,
                &server.wrapping_public_key(),
                document_id,
            )?);
        }

        tracing::debug!(
            document = %document_id.to_hex(),
            threshold,
            servers = n,
            "document sealed"
        );

        Ok((
            EncryptedObject {
                version: OBJECT_VERSION,
                scope_id,
                document_id: document_id.clone(),
                threshold,
                shares,
                envelope,
            },
            content_key,
        ))
    }

    /// Open a sealed document through the key-server quorum.
    ///
    /// Fans out to every server in the embedded set in parallel and
    /// returns once `threshold` distinct servers have released valid
    /// shares; late and failed responders are ignored. Failures are
    /// terminal for the attempt: retrying with the same session/proof
    /// cannot succeed, restart from a fresh approval.
    pub async fn decrypt(
        &self,
        object: &EncryptedObject,
        session: &SessionKey,
        approval: &ApprovalPayload,
        now_ms: i64,
    ) -> Result<Vec<u8>> {
        // Client-side precheck; servers enforce it again.
        session.ensure_active(now_ms).map_err(|e| match e {
            SessionError::SessionExpired { .. } => ThresholdError::SessionExpired,
            other => ThresholdError::SessionError(other),
        })?;

        let certificate = session.certificate()?;
        let request_signature = session.sign_request(&approval.bytes, now_ms)?;

        let by_id: HashMap<ObjectId, Arc<dyn KeyServer>> = self
            .servers
            .iter()
            .map(|s| (s.server_id(), Arc::clone(s)))
            .collect();

        let need = usize::from(object.threshold);
        let timeout = self.config.request_timeout;
        let mut tasks: JoinSet<Result<crate::server::ShareResponse>> = JoinSet::new();

        for wrapped in &object.shares {
            let Some(server) = by_id.get(&wrapped.server_id) else {
                tracing::warn!(server = %wrapped.server_id, "embedded server not configured");
                continue;
            };
            let server = Arc::clone(server);
            let request = FetchSharesRequest {
                wrapped: wrapped.clone(),
                approval: approval.clone(),
                certificate: certificate.clone(),
                request_signature,
            };
            tasks.spawn(async move {
                match tokio::time::timeout(timeout, server.fetch_share(request, now_ms)).await {
                    Ok(result) => result,
                    Err(_) => Err(ThresholdError::TransportError(format!(
                        "server {} timed out",
                        server.server_id()
                    ))),
                }
            });
        }

        let mut shares: Vec<KeyShare> = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut proof_rejection: Option<ThresholdError> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(ThresholdError::TransportError(e.to_string())),
            };
            match result {
                Ok(response) => {
                    if seen.insert(response.server_id) {
                        shares.push(response.share);
                    }
                    if shares.len() >= need {
                        // Quorum reached; remaining responders are
                        // ignored.
                        tasks.abort_all();
                        let content_key = combine(object.threshold, &shares)?;
                        return object.envelope.open(&content_key, &object.document_id);
                    }
                }
                Err(err @ (ThresholdError::InvalidProof(_) | ThresholdError::SessionExpired)) => {
                    // An authorization rejection from any server is
                    // decisive: every honest server evaluates the same
                    // registry state.
                    if proof_rejection.is_none() {
                        proof_rejection = Some(err);
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "key-server call failed");
                }
            }
        }

        if let Some(rejection) = proof_rejection {
            return Err(rejection);
        }
        Err(ThresholdError::InsufficientShares {
            got: shares.len(),
            need,
        })
    }

    /// Open a sealed document locally with the backup key, bypassing
    /// the server quorum entirely.
    pub fn decrypt_with_backup(
        &self,
        object: &EncryptedObject,
        backup_key: &ContentKey,
    ) -> Result<Vec<u8>> {
        object.envelope.open(backup_key, &object.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::MemoryKeyServer;
    use sealbox_core::{derive_random, Address, Keypair};
    use sealbox_registry::{CallOutcome, Ledger, MemoryLedger, RegistryCall};
    use sealbox_session::{ApprovalIntent, SessionKey, SignatureInput};

    struct Cluster {
        gateway: ThresholdGateway,
        servers: Vec<Arc<MemoryKeyServer>>,
        ledger: Arc<MemoryLedger>,
        group_id: ObjectId,
        cap_id: ObjectId,
        namespace: sealbox_core::Namespace,
    }

    const SCOPE: ObjectId = ObjectId::from_bytes([0x50; 32]);

    async fn cluster(n: u8) -> Cluster {
        let ledger = Arc::new(MemoryLedger::new());
        let (group, cap) = match ledger
            .execute(
                Address::ZERO,
                RegistryCall::CreateGroup {
                    name: "g".into(),
                    correlation_id: "c".into(),
                },
            )
            .await
            .unwrap()
        {
            CallOutcome::Created { group, capability } => (group, capability),
            _ => unreachable!(),
        };

        let servers: Vec<Arc<MemoryKeyServer>> = (1..=n)
            .map(|i| {
                Arc::new(MemoryKeyServer::new(
                    ObjectId::from_bytes([i; 32]),
                    Arc::clone(&ledger) as Arc<dyn Ledger>,
                ))
            })
            .collect();

        let gateway = ThresholdGateway::new(
            servers
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn KeyServer>)
                .collect(),
            GatewayConfig::default(),
        );

        Cluster {
            gateway,
            servers,
            ledger,
            group_id: group.id,
            cap_id: cap.id,
            namespace: group.namespace(),
        }
    }

    async fn enroll(cluster: &Cluster, address: Address) {
        cluster
            .ledger
            .execute(
                Address::ZERO,
                RegistryCall::AddMember {
                    group_id: cluster.group_id,
                    cap_id: cluster.cap_id,
                    address,
                },
            )
            .await
            .unwrap();
    }

    fn bound_session(primary: &Keypair) -> SessionKey {
        let mut session = SessionKey::create(primary.public_key(), SCOPE, 10, 0);
        let sig = primary.sign(&session.binding_message());
        session.bind(SignatureInput::Raw(sig), 0).unwrap();
        session
    }

    fn approval_for(
        cluster: &Cluster,
        doc_id: &DocumentId,
        sender: Address,
    ) -> ApprovalPayload {
        ApprovalIntent::new(SCOPE, cluster.group_id, doc_id.clone(), sender)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_two_of_two() {
        let cluster = cluster(2).await;
        let primary = Keypair::generate();
        enroll(&cluster, primary.address()).await;

        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, _backup) = cluster
            .gateway
            .encrypt(SCOPE, &doc_id, b"hello world", 2)
            .unwrap();

        let session = bound_session(&primary);
        let approval = approval_for(&cluster, &doc_id, primary.address());

        let plaintext = cluster
            .gateway
            .decrypt(&object, &session, &approval, 1_000)
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[tokio::test]
    async fn test_quorum_survives_one_offline_of_three() {
        let cluster = cluster(3).await;
        let primary = Keypair::generate();
        enroll(&cluster, primary.address()).await;

        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, _) = cluster
            .gateway
            .encrypt(SCOPE, &doc_id, b"resilient", 2)
            .unwrap();

        cluster.servers[0].set_offline(true);

        let session = bound_session(&primary);
        let approval = approval_for(&cluster, &doc_id, primary.address());
        let plaintext = cluster
            .gateway
            .decrypt(&object, &session, &approval, 1_000)
            .await
            .unwrap();
        assert_eq!(plaintext, b"resilient");
    }

    #[tokio::test]
    async fn test_insufficient_shares_below_quorum() {
        let cluster = cluster(2).await;
        let primary = Keypair::generate();
        enroll(&cluster, primary.address()).await;

        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, _) = cluster
            .gateway
            .encrypt(SCOPE, &doc_id, b"unreachable", 2)
            .unwrap();

        // Only t-1 servers responsive.
        cluster.servers[1].set_offline(true);

        let session = bound_session(&primary);
        let approval = approval_for(&cluster, &doc_id, primary.address());
        let err = cluster
            .gateway
            .decrypt(&object, &session, &approval, 1_000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ThresholdError::InsufficientShares { got: 1, need: 2 }
        ));
    }

    #[tokio::test]
    async fn test_non_member_gets_invalid_proof() {
        let cluster = cluster(2).await;
        let owner = Keypair::generate();
        enroll(&cluster, owner.address()).await;

        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, _) = cluster
            .gateway
            .encrypt(SCOPE, &doc_id, b"private", 2)
            .unwrap();

        let outsider = Keypair::generate();
        let session = bound_session(&outsider);
        let approval = approval_for(&cluster, &doc_id, outsider.address());
        let err = cluster
            .gateway
            .decrypt(&object, &session, &approval, 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ThresholdError::InvalidProof(_)));
    }

    #[tokio::test]
    async fn test_expired_session_rejected_before_fanout() {
        let cluster = cluster(2).await;
        let primary = Keypair::generate();
        enroll(&cluster, primary.address()).await;

        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, _) = cluster.gateway.encrypt(SCOPE, &doc_id, b"x", 2).unwrap();

        let session = bound_session(&primary); // ttl 10 min
        let approval = approval_for(&cluster, &doc_id, primary.address());
        let err = cluster
            .gateway
            .decrypt(&object, &session, &approval, 11 * 60_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ThresholdError::SessionExpired));
    }

    #[tokio::test]
    async fn test_backup_key_bypasses_quorum() {
        let cluster = cluster(2).await;
        let (doc_id, _) = derive_random(&cluster.namespace);
        let (object, backup) = cluster
            .gateway
            .encrypt(SCOPE, &doc_id, b"escape hatch", 2)
            .unwrap();

        // All servers down; the backup key still opens locally.
        cluster.servers[0].set_offline(true);
        cluster.servers[1].set_offline(true);

        let plaintext = cluster.gateway.decrypt_with_backup(&object, &backup).unwrap();
        assert_eq!(plaintext, b"escape hatch");
    }

    #[tokio::test]
    async fn test_threshold_bounds_checked() {
        let cluster = cluster(2).await;
        let (doc_id, _) = derive_random(&cluster.namespace);

        assert!(matches!(
            cluster.gateway.encrypt(SCOPE, &doc_id, b"x", 0),
            Err(ThresholdError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            cluster.gateway.encrypt(SCOPE, &doc_id, b"x", 3),
            Err(ThresholdError::InvalidThreshold { .. })
        ));
    }
}
