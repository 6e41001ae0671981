//! The unified Sealbox client.
//!
//! Producer flow: create a group, enroll members, seal a document
//! (derive identifier, encrypt, upload, publish the blob reference).
//! Consumer flow: download, bind a session, build the approval, open
//! through the key-server quorum.

use std::sync::Arc;

use sealbox_blob::{BlobGateway, BlobStore};
use sealbox_core::{
    derive_deterministic, derive_random, Address, BlobId, DocumentId, Ed25519PublicKey, Salt,
};
use sealbox_registry::{
    run_strategies, AccessGroup, AdminCapability, CallOutcome, Ledger, RegistryCall, RegistryError,
};
use sealbox_session::{ApprovalIntent, SessionKey, SignatureInput};
use sealbox_threshold::{ContentKey, EncryptedObject, KeyServer, ThresholdGateway};

use crate::config::{ClientConfig, Clock};
use crate::error::{Result, SealboxError};

/// How the document identifier's salt is produced.
#[derive(Debug, Clone)]
pub enum SaltMode {
    /// Fresh random salt; every seal yields an unrelated identifier.
    Random,
    /// Salt derived from a correlation id and a set of public keys, so
    /// independent callers with the same inputs converge on the same
    /// identifier. Key order is irrelevant.
    Deterministic {
        correlation_id: String,
        public_keys: Vec<Vec<u8>>,
    },
}

/// Everything a producer needs to hand out after sealing.
pub struct SealedDocument {
    /// Where the ciphertext lives.
    pub blob_id: BlobId,
    /// The identity it was encrypted under.
    pub document_id: DocumentId,
    /// The salt portion of the identifier.
    pub salt: Salt,
    /// Local backup key. Bypasses the quorum; discard it unless an
    /// escape hatch is wanted.
    pub backup_key: ContentKey,
}

/// The client facade over ledger, key servers, and blob store.
pub struct SealboxClient {
    ledger: Arc<dyn Ledger>,
    blob: BlobGateway,
    gateway: ThresholdGateway,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
}

impl SealboxClient {
    /// Wire up a client. All collaborators are passed in; nothing is
    /// read from the environment.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        blob_store: Arc<dyn BlobStore>,
        key_servers: Vec<Arc<dyn KeyServer>>,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let blob = BlobGateway::new(blob_store, config.retry.clone());
        let gateway = ThresholdGateway::new(key_servers, config.gateway.clone());
        Self {
            ledger,
            blob,
            gateway,
            config,
            clock,
        }
    }

    /// The configured authorization scope.
    pub fn scope_id(&self) -> sealbox_core::ObjectId {
        self.config.scope_id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Producer side
    // ─────────────────────────────────────────────────────────────────────

    /// Create a group and receive its one admin capability.
    pub async fn create_group(
        &self,
        admin: Address,
        name: &str,
        correlation_id: &str,
    ) -> Result<(AccessGroup, AdminCapability)> {
        let outcome = self
            .ledger
            .execute(
                admin,
                RegistryCall::CreateGroup {
                    name: name.to_string(),
                    correlation_id: correlation_id.to_string(),
                },
            )
            .await?;
        match outcome {
            CallOutcome::Created { group, capability } => {
                tracing::debug!(group = %group.id, "access group created");
                Ok((group, capability))
            }
            other => Err(SealboxError::UnexpectedOutcome(format!("{other:?}"))),
        }
    }

    /// Enroll members, batch first with sequential fallback.
    ///
    /// The batch transaction and the sequential form agree on the end
    /// state, not on failure semantics: a failed batch commits nothing,
    /// after which per-address calls are made and addresses that are
    /// already present are tolerated.
    pub async fn enroll_members(
        &self,
        admin: Address,
        group_id: sealbox_core::ObjectId,
        cap_id: sealbox_core::ObjectId,
        addresses: &[Address],
    ) -> Result<()> {
        let ledger = &self.ledger;

        let batch: sealbox_registry::fallback::BoxedStrategy<'_, ()> = Box::pin(async move {
            ledger
                .execute(
                    admin,
                    RegistryCall::AddMembers {
                        group_id,
                        cap_id,
                        addresses: addresses.to_vec(),
                    },
                )
                .await?;
            Ok(())
        });

        let sequential: sealbox_registry::fallback::BoxedStrategy<'_, ()> =
            Box::pin(async move {
                for address in addresses {
                    let result = ledger
                        .execute(
                            admin,
                            RegistryCall::AddMember {
                                group_id,
                                cap_id,
                                address: *address,
                            },
                        )
                        .await;
                    match result {
                        Ok(_) => {}
                        // Partial progress from an earlier attempt is
                        // fine; converge on the end state.
                        Err(RegistryError::DuplicateMember { .. }) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(())
            });

        run_strategies("enroll_members", vec![("batch", batch), ("sequential", sequential)])
            .await?;
        Ok(())
    }

    /// Remove a member. Idempotent.
    pub async fn remove_member(
        &self,
        admin: Address,
        group_id: sealbox_core::ObjectId,
        cap_id: sealbox_core::ObjectId,
        address: Address,
    ) -> Result<()> {
        self.ledger
            .execute(
                admin,
                RegistryCall::RemoveMember {
                    group_id,
                    cap_id,
                    address,
                },
            )
            .await?;
        Ok(())
    }

    /// Seal a document for a group's members.
    ///
    /// The identifier is derived and fixed *before* encryption (it is
    /// part of the ciphertext's cryptographic identity), then the
    /// object is uploaded and its blob reference published under the
    /// group.
    pub async fn seal_document(
        &self,
        admin: Address,
        group: &AccessGroup,
        cap: &AdminCapability,
        plaintext: &[u8],
        salt_mode: SaltMode,
        threshold: Option<u8>,
    ) -> Result<SealedDocument> {
        // Identifier first. Hard ordering precondition.
        let namespace = group.namespace();
        let (document_id, salt) = match salt_mode {
            SaltMode::Random => derive_random(&namespace),
            SaltMode::Deterministic {
                correlation_id,
                public_keys,
            } => derive_deterministic(&namespace, &correlation_id, &public_keys)?,
        };

        let threshold = threshold.unwrap_or(self.config.default_threshold);
        let (object, backup_key) =
            self.gateway
                .encrypt(self.config.scope_id, &document_id, plaintext, threshold)?;

        let bytes = object.to_bytes()?;
        let outcome = self.blob.upload(&bytes, self.config.store_options).await?;
        let blob_id = outcome.blob_id();

        self.ledger
            .execute(
                admin,
                RegistryCall::PublishBlobReference {
                    group_id: group.id,
                    cap_id: cap.id,
                    blob_id,
                },
            )
            .await?;

        tracing::debug!(
            group = %group.id,
            blob = %blob_id,
            document = %document_id.to_hex(),
            "document sealed and published"
        );

        Ok(SealedDocument {
            blob_id,
            document_id,
            salt,
            backup_key,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Consumer side
    // ─────────────────────────────────────────────────────────────────────

    /// Create a session for the principal owning the primary key,
    /// scoped to this client's scope, with the configured ttl.
    ///
    /// The returned session is awaiting its binding signature; hand
    /// `binding_message()` to the primary-credential signer and pass
    /// the result to [`bind_session`](Self::bind_session).
    pub fn create_session(&self, primary_public_key: Ed25519PublicKey) -> SessionKey {
        SessionKey::create(
            primary_public_key,
            self.config.scope_id,
            self.config.session_ttl_min,
            self.clock.now_ms(),
        )
    }

    /// Bind a session with the signature produced by the primary
    /// credential, in either accepted shape.
    pub fn bind_session(&self, session: &mut SessionKey, signature: &[u8]) -> Result<()> {
        let input = SignatureInput::parse(signature)?;
        session.bind(input, self.clock.now_ms())?;
        Ok(())
    }

    /// Download and open a sealed document.
    ///
    /// Rebuilds the approval intent with the session owner as sender
    /// and decrypts through the key-server quorum. Failures
    /// (`InsufficientShares`, `InvalidProof`, `SessionExpired`) are
    /// terminal for the attempt; restart from a fresh session or
    /// approval rather than retrying blindly.
    pub async fn unseal_document(
        &self,
        blob_id: &BlobId,
        group_id: sealbox_core::ObjectId,
        session: &SessionKey,
    ) -> Result<Vec<u8>> {
        let bytes = self.blob.download(blob_id).await?;
        let object = EncryptedObject::from_bytes(&bytes)?;

        let approval = ApprovalIntent::new(
            self.config.scope_id,
            group_id,
            object.document_id.clone(),
            session.owner(),
        )
        .build()?;

        let plaintext = self
            .gateway
            .decrypt(&object, session, &approval, self.clock.now_ms())
            .await?;
        Ok(plaintext)
    }

    /// Open a downloaded object locally with its backup key.
    pub async fn unseal_with_backup(
        &self,
        blob_id: &BlobId,
        backup_key: &ContentKey,
    ) -> Result<Vec<u8>> {
        let bytes = self.blob.download(blob_id).await?;
        let object = EncryptedObject::from_bytes(&bytes)?;
        Ok(self.gateway.decrypt_with_backup(&object, backup_key)?)
    }

    /// Metadata-only probe for a published blob.
    pub async fn blob_exists(&self, blob_id: &BlobId) -> Result<bool> {
        Ok(self.blob.exists(blob_id).await?)
    }
}
