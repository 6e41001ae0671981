//! Content envelope.
//!
//! The document plaintext is encrypted exactly once under the content
//! key, with the document identifier bound in as associated data so a
//! ciphertext cannot be replayed under a different identity.

use serde::{Deserialize, Serialize};

use sealbox_core::DocumentId;

use crate::crypto::{ContentKey, EncryptionNonce};
use crate::error::Result;

/// The AEAD-encrypted document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Nonce used for encryption (unique per envelope).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt plaintext under the content key, bound to an identifier.
    pub fn seal(plaintext: &[u8], key: &ContentKey, document_id: &DocumentId) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce, document_id.as_bytes())?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt with the content key; the identifier must match the one
    /// bound at encryption time.
    pub fn open(&self, key: &ContentKey, document_id: &DocumentId) -> Result<Vec<u8>> {
        key.decrypt(&self.ciphertext, &self.nonce, document_id.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::{derive_random, Namespace};

    #[test]
    fn test_seal_open_roundtrip() {
        let key = ContentKey::generate();
        let (id, _) = derive_random(&Namespace([0x01; 32]));

        let envelope = Envelope::seal(b"hello, sealed world!", &key, &id).unwrap();
        let plaintext = envelope.open(&key, &id).unwrap();
        assert_eq!(plaintext, b"hello, sealed world!");
    }

    #[test]
    fn test_wrong_identifier_fails() {
        let key = ContentKey::generate();
        let ns = Namespace([0x01; 32]);
        let (id, _) = derive_random(&ns);
        let (other, _) = derive_random(&ns);

        let envelope = Envelope::seal(b"secret", &key, &id).unwrap();
        assert!(envelope.open(&key, &other).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let (id, _) = derive_random(&Namespace([0x01; 32]));
        let envelope = Envelope::seal(b"secret", &ContentKey::generate(), &id).unwrap();
        assert!(envelope.open(&ContentKey::generate(), &id).is_err());
    }
}
