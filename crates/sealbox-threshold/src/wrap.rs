//! Per-server share wrapping.
//!
//! Each Shamir share is encrypted to exactly one key server's X25519
//! public key via ephemeral ECDH. The wrap key is derived from the
//! shared secret with the document identifier as context, so a wrapped
//! share is useless for any other document even to its own server.

use crate::crypto::{EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};
use crate::error::Result;
use crate::object::ServerShare;
use crate::shares::KeyShare;

use sealbox_core::{DocumentId, ObjectId};

/// Wrap a share to one server's public key.
pub fn wrap_share(
    server_id: ObjectId,
    share: &KeyShare,
    server_public: &X25519PublicKey,
    document_id: &DocumentId,
) -> Result<ServerShare> {
    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public = ephemeral.public_key();

    let shared = ephemeral.diffie_hellman(server_public);
    let wrap_key = shared.derive_wrap_key(document_id.as_bytes());

    let nonce = EncryptionNonce::generate();
    let wrapped = wrap_key.encrypt(&share.to_bytes(), &nonce, document_id.as_bytes())?;

    Ok(ServerShare {
        server_id,
        ephemeral_public,
        nonce,
        wrapped_share: wrapped,
    })
}

/// Unwrap a share with the server's static secret.
///
/// Only the server whose public key the share was wrapped to can do
/// this; it happens server-side after the approval payload validates.
pub fn unwrap_share(
    wrapped: &ServerShare,
    server_secret: &X25519StaticSecret,
    document_id: &DocumentId,
) -> Result<KeyShare> {
    let shared = server_secret.diffie_hellman(&wrapped.ephemeral_public);
    let wrap_key = shared.derive_wrap_key(document_id.as_bytes());

    let bytes = wrap_key.decrypt(&wrapped.wrapped_share, &wrapped.nonce, document_id.as_bytes())?;
    KeyShare::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ContentKey;
    use crate::shares::split;
    use sealbox_core::{derive_random, Namespace};

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let server_secret = X25519StaticSecret::generate();
        let server_id = ObjectId::from_bytes([0x01; 32]);
        let (doc_id, _) = derive_random(&Namespace([0x02; 32]));

        let key = ContentKey::generate();
        let shares = split(&key, 2, 2).unwrap();

        let wrapped = wrap_share(server_id, &shares[0], &server_secret.public_key(), &doc_id).unwrap();
        let unwrapped = unwrap_share(&wrapped, &server_secret, &doc_id).unwrap();
        assert_eq!(unwrapped, shares[0]);
    }

    #[test]
    fn test_wrong_server_cannot_unwrap() {
        let server_secret = X25519StaticSecret::generate();
        let other_secret = X25519StaticSecret::generate();
        let (doc_id, _) = derive_random(&Namespace([0x02; 32]));

        let key = ContentKey::generate();
        let shares = split(&key, 1, 1).unwrap();

        let wrapped = wrap_share(
            ObjectId::from_bytes([0x01; 32]),
            &shares[0],
            &server_secret.public_key(),
            &doc_id,
        )
        .unwrap();
        assert!(unwrap_share(&wrapped, &other_secret, &doc_id).is_err());
    }

    #[test]
    fn test_share_is_bound_to_document() {
        let server_secret = X25519StaticSecret::generate();
        let ns = Namespace([0x02; 32]);
        let (doc_id, _) = derive_random(&ns);
        let (other_id, _) = derive_random(&ns);

        let key = ContentKey::generate();
        let shares = split(&key, 1, 1).unwrap();

        let wrapped = wrap_share(
            ObjectId::from_bytes([0x01; 32]),
            &shares[0],
            &server_secret.public_key(),
            &doc_id,
        )
        .unwrap();
        assert!(unwrap_share(&wrapped, &server_secret, &other_id).is_err());
    }
}
