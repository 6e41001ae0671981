//! Cryptographic utilities for the threshold layer.
//!
//! X25519 key agreement for share wrapping and ChaCha20-Poly1305 for
//! authenticated encryption of content and shares.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{Result, ThresholdError};

/// An X25519 public key (32 bytes). Key servers publish one as their
/// wrapping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret. Each key server holds exactly one.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Derive a wrapping key from this shared secret, bound to a
    /// context (the document identifier).
    pub fn derive_wrap_key(&self, context: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key("sealbox-share-wrap-v0");
        hasher.update(&self.0);
        hasher.update(context);
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305.
///
/// Used both as the content key (encrypting the document) and as the
/// derived wrapping key (encrypting a share for one server).
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt with this key, binding `aad` into the authentication tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce, aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| ThresholdError::EncryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .encrypt(nonce, Payload { msg: plaintext, aad })
            .map_err(|e| ThresholdError::EncryptionError(e.to_string()))
    }

    /// Decrypt with this key; `aad` must match what was bound at
    /// encryption time.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce, aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| ThresholdError::DecryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad })
            .map_err(|e| ThresholdError::DecryptionError(e.to_string()))
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        write!(f, "ContentKey(..)")
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_key_agreement() {
        let server_secret = X25519StaticSecret::generate();
        let server_public = server_secret.public_key();

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let client_shared = ephemeral.diffie_hellman(&server_public);
        let server_shared = server_secret.diffie_hellman(&ephemeral_public);

        assert_eq!(
            client_shared.derive_wrap_key(b"ctx").as_bytes(),
            server_shared.derive_wrap_key(b"ctx").as_bytes()
        );
    }

    #[test]
    fn test_encrypt_decrypt_with_aad() {
        let key = ContentKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"hello", &nonce, b"doc-id").unwrap();
        let plaintext = key.decrypt(&ciphertext, &nonce, b"doc-id").unwrap();
        assert_eq!(plaintext, b"hello");

        // Wrong AAD fails authentication.
        assert!(key.decrypt(&ciphertext, &nonce, b"other-id").is_err());
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = ContentKey::generate();
        let key2 = ContentKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce, b"").unwrap();
        assert!(key2.decrypt(&ciphertext, &nonce, b"").is_err());
    }

    #[test]
    fn test_wrap_key_derivation_contexts() {
        let shared = SharedKey([0x42; 32]);
        let a = shared.derive_wrap_key(b"context-a");
        let b = shared.derive_wrap_key(b"context-b");
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(
            shared.derive_wrap_key(b"context-a").as_bytes(),
            a.as_bytes()
        );
    }
}
