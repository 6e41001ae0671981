//! The session key authority.
//!
//! A session key is an ephemeral keypair that stands in for the primary
//! credential for a bounded window. Lifecycle:
//!
//! ```text
//! Created -> AwaitingSignature -> Bound -> Revoked
//! ```
//!
//! Expiry is never stored: it is computed from the creation timestamp
//! and ttl at each use, so a session that outlives its ttl fails
//! `SessionExpired` no matter how many decrypts it served before.

use serde::{Deserialize, Serialize};

use sealbox_core::{Address, Ed25519PublicKey, Ed25519Signature, Keypair, ObjectId};

use crate::error::{Result, SessionError};
use crate::signature::SignatureInput;

/// Domain tag for the binding message.
const BINDING_DOMAIN: &str = "sealbox-session-binding-v0";

/// Lifecycle state of a session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Freshly created; the binding message has not been issued yet.
    Created,
    /// The binding message was handed to the signer; waiting for the
    /// signature to come back.
    AwaitingSignature,
    /// Bound to the primary credential; usable until ttl lapses.
    Bound,
    /// Explicitly revoked by the owner.
    Revoked,
}

/// Canonical binding-message payload.
///
/// Unique per (owner, scope, ttl, creation time, ephemeral key); the
/// signer signs these bytes exactly once per session.
#[derive(Serialize)]
struct BindingMessage<'a> {
    domain: &'a str,
    owner: &'a Address,
    scope: &'a ObjectId,
    ttl_min: u32,
    created_at_ms: i64,
    session_public_key: &'a Ed25519PublicKey,
}

fn binding_message_bytes(
    owner: &Address,
    scope: &ObjectId,
    ttl_min: u32,
    created_at_ms: i64,
    session_public_key: &Ed25519PublicKey,
) -> Vec<u8> {
    let message = BindingMessage {
        domain: BINDING_DOMAIN,
        owner,
        scope,
        ttl_min,
        created_at_ms,
        session_public_key,
    };
    let mut buf = Vec::new();
    ciborium::into_writer(&message, &mut buf).expect("CBOR serialization failed");
    buf
}

/// A time-boxed ephemeral credential for key-server requests.
pub struct SessionKey {
    owner: Address,
    primary_public_key: Ed25519PublicKey,
    scope: ObjectId,
    ttl_min: u32,
    created_at_ms: i64,
    ephemeral: Keypair,
    state: SessionState,
    binding_signature: Option<Ed25519Signature>,
}

impl SessionKey {
    /// Create a session for the principal owning `primary_public_key`,
    /// scoped to one authorization scope, valid for `ttl_min` minutes
    /// from `now_ms`.
    pub fn create(
        primary_public_key: Ed25519PublicKey,
        scope: ObjectId,
        ttl_min: u32,
        now_ms: i64,
    ) -> Self {
        Self {
            owner: Address::from_public_key(&primary_public_key),
            primary_public_key,
            scope,
            ttl_min,
            created_at_ms: now_ms,
            ephemeral: Keypair::generate(),
            state: SessionState::Created,
            binding_signature: None,
        }
    }

    /// The owning principal's address.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The authorization scope this session is limited to.
    pub fn scope(&self) -> ObjectId {
        self.scope
    }

    /// The ephemeral public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.ephemeral.public_key()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// When this session stops being usable.
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at_ms + i64::from(self.ttl_min) * 60_000
    }

    /// Whether the ttl has lapsed at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms()
    }

    /// The canonical message the primary credential must sign.
    ///
    /// Issuing the message moves a `Created` session to
    /// `AwaitingSignature`; re-issuing returns the same bytes.
    pub fn binding_message(&mut self) -> Vec<u8> {
        if self.state == SessionState::Created {
            self.state = SessionState::AwaitingSignature;
        }
        binding_message_bytes(
            &self.owner,
            &self.scope,
            self.ttl_min,
            self.created_at_ms,
            &self.ephemeral.public_key(),
        )
    }

    /// Bind the session with a signature over the binding message.
    ///
    /// The input may arrive in either accepted shape; it is normalized
    /// before verification. Fails `SessionExpired` past ttl and
    /// `InvalidSignature` when the normalized signature does not verify
    /// under the primary credential.
    pub fn bind(&mut self, input: SignatureInput, now_ms: i64) -> Result<()> {
        match self.state {
            SessionState::Bound => return Err(SessionError::AlreadyBound),
            SessionState::Revoked => return Err(SessionError::Revoked),
            SessionState::Created | SessionState::AwaitingSignature => {}
        }
        if self.is_expired(now_ms) {
            return Err(SessionError::SessionExpired {
                expires_at_ms: self.expires_at_ms(),
                now_ms,
            });
        }

        let message = binding_message_bytes(
            &self.owner,
            &self.scope,
            self.ttl_min,
            self.created_at_ms,
            &self.ephemeral.public_key(),
        );
        let signature = input.into_signature();
        self.primary_public_key
            .verify(&message, &signature)
            .map_err(|_| {
                SessionError::InvalidSignature("binding signature does not verify".into())
            })?;

        self.binding_signature = Some(signature);
        self.state = SessionState::Bound;
        Ok(())
    }

    /// Revoke the session. Irreversible.
    pub fn revoke(&mut self) {
        self.state = SessionState::Revoked;
        self.binding_signature = None;
    }

    /// Check the session is bound and inside its ttl.
    pub fn ensure_active(&self, now_ms: i64) -> Result<()> {
        match self.state {
            SessionState::Bound => {}
            SessionState::Revoked => return Err(SessionError::Revoked),
            _ => return Err(SessionError::NotBound),
        }
        if self.is_expired(now_ms) {
            return Err(SessionError::SessionExpired {
                expires_at_ms: self.expires_at_ms(),
                now_ms,
            });
        }
        Ok(())
    }

    /// Sign a key-server request with the ephemeral key.
    pub fn sign_request(&self, request: &[u8], now_ms: i64) -> Result<Ed25519Signature> {
        self.ensure_active(now_ms)?;
        Ok(self.ephemeral.sign(request))
    }

    /// The portable proof of binding that travels with key requests.
    pub fn certificate(&self) -> Result<SessionCertificate> {
        let binding_signature = self.binding_signature.ok_or(SessionError::NotBound)?;
        Ok(SessionCertificate {
            owner: self.owner,
            primary_public_key: self.primary_public_key,
            scope: self.scope,
            ttl_min: self.ttl_min,
            created_at_ms: self.created_at_ms,
            session_public_key: self.ephemeral.public_key(),
            binding_signature,
        })
    }
}

/// Everything a key server needs to verify a session independently.
///
/// Servers never talk to the session authority; they check the
/// certificate itself: the owner address must derive from the primary
/// key, the binding signature must verify over the reconstructed
/// canonical message, and the ttl must not have lapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCertificate {
    /// The owning principal.
    pub owner: Address,
    /// The primary credential's public key.
    pub primary_public_key: Ed25519PublicKey,
    /// The authorization scope.
    pub scope: ObjectId,
    /// Session lifetime in minutes.
    pub ttl_min: u32,
    /// Creation timestamp (Unix milliseconds).
    pub created_at_ms: i64,
    /// The ephemeral session public key.
    pub session_public_key: Ed25519PublicKey,
    /// The primary credential's signature over the binding message.
    pub binding_signature: Ed25519Signature,
}

impl SessionCertificate {
    /// When the session stops being usable.
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at_ms + i64::from(self.ttl_min) * 60_000
    }

    /// Verify the certificate at `now_ms`.
    pub fn verify(&self, now_ms: i64) -> Result<()> {
        if now_ms > self.expires_at_ms() {
            return Err(SessionError::SessionExpired {
                expires_at_ms: self.expires_at_ms(),
                now_ms,
            });
        }

        if Address::from_public_key(&self.primary_public_key) != self.owner {
            return Err(SessionError::InvalidSignature(
                "owner address does not derive from primary key".into(),
            ));
        }

        let message = binding_message_bytes(
            &self.owner,
            &self.scope,
            self.ttl_min,
            self.created_at_ms,
            &self.session_public_key,
        );
        self.primary_public_key
            .verify(&message, &self.binding_signature)
            .map_err(|_| {
                SessionError::InvalidSignature("binding signature does not verify".into())
            })
    }

    /// Verify a request signature made with the session key.
    pub fn verify_request(&self, request: &[u8], signature: &Ed25519Signature) -> Result<()> {
        self.session_public_key
            .verify(request, signature)
            .map_err(|_| SessionError::InvalidSignature("request signature does not verify".into()))
    }
}
