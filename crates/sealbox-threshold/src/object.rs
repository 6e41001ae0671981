//! The self-describing encrypted object.
//!
//! Everything decryption needs (identity, threshold, the server set
//! and their wrapped shares) travels inside the ciphertext itself.
//! Only a live session and an approval payload are supplied at decrypt
//! time. The object is immutable once produced.

use serde::{Deserialize, Serialize};

use sealbox_core::{DocumentId, ObjectId};

use crate::crypto::{EncryptionNonce, X25519PublicKey};
use crate::envelope::Envelope;
use crate::error::{Result, ThresholdError};

/// Current encrypted-object schema version.
pub const OBJECT_VERSION: u8 = 0;

/// One server's wrapped share, as embedded in the object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerShare {
    /// The key server this share is wrapped to.
    pub server_id: ObjectId,

    /// Ephemeral X25519 public key (client's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used when wrapping.
    pub nonce: EncryptionNonce,

    /// The Shamir share, encrypted to the server's wrapping key.
    pub wrapped_share: Vec<u8>,
}

/// A sealed document: envelope plus embedded threshold metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    /// Schema version.
    pub version: u8,

    /// The authorization scope (registry package) this was sealed under.
    pub scope_id: ObjectId,

    /// The identity the document was encrypted under.
    pub document_id: DocumentId,

    /// How many distinct servers must release shares.
    pub threshold: u8,

    /// One wrapped share per server in the embedded set.
    pub shares: Vec<ServerShare>,

    /// The encrypted document payload.
    pub envelope: Envelope,
}

impl EncryptedObject {
    /// Serialize to CBOR bytes (the form stored in the blob store).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ThresholdError::InvalidObject(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes, checking version and internal
    /// consistency.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let object: Self = ciborium::from_reader(bytes)
            .map_err(|e| ThresholdError::InvalidObject(e.to_string()))?;

        if object.version != OBJECT_VERSION {
            return Err(ThresholdError::InvalidObject(format!(
                "unsupported version {}",
                object.version
            )));
        }
        if object.threshold == 0 || usize::from(object.threshold) > object.shares.len() {
            return Err(ThresholdError::InvalidObject(format!(
                "threshold {} incompatible with {} embedded shares",
                object.threshold,
                object.shares.len()
            )));
        }
        Ok(object)
    }

    /// The embedded server set, in embed order.
    pub fn server_ids(&self) -> Vec<ObjectId> {
        self.shares.iter().map(|s| s.server_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ContentKey;
    use crate::envelope::Envelope as Env;
    use sealbox_core::{derive_random, Namespace};

    fn sample_object(threshold: u8, servers: u8) -> EncryptedObject {
        let (doc_id, _) = derive_random(&Namespace([0x01; 32]));
        let key = ContentKey::generate();
        let envelope = Env::seal(b"payload", &key, &doc_id).unwrap();

        let shares = (1..=servers)
            .map(|i| ServerShare {
                server_id: ObjectId::from_bytes([i; 32]),
                ephemeral_public: X25519PublicKey::from_bytes([i; 32]),
                nonce: EncryptionNonce::from_bytes([i; 12]),
                wrapped_share: vec![i; 49],
            })
            .collect();

        EncryptedObject {
            version: OBJECT_VERSION,
            scope_id: ObjectId::from_bytes([0xaa; 32]),
            document_id: doc_id,
            threshold,
            shares,
            envelope,
        }
    }

    #[test]
    fn test_cbor_roundtrip() {
        let object = sample_object(2, 3);
        let bytes = object.to_bytes().unwrap();
        let recovered = EncryptedObject::from_bytes(&bytes).unwrap();
        assert_eq!(object, recovered);
    }

    #[test]
    fn test_threshold_consistency_checked_on_parse() {
        let mut object = sample_object(2, 3);
        object.threshold = 4; // more than embedded shares
        let bytes = object.to_bytes().unwrap();
        assert!(EncryptedObject::from_bytes(&bytes).is_err());

        object.threshold = 0;
        let bytes = object.to_bytes().unwrap();
        assert!(EncryptedObject::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut object = sample_object(1, 1);
        object.version = 9;
        let bytes = object.to_bytes().unwrap();
        let err = EncryptedObject::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ThresholdError::InvalidObject(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(EncryptedObject::from_bytes(b"not cbor at all").is_err());
    }
}
