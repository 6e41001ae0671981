//! Document identity derivation.
//!
//! Every document is encrypted under an identifier of the form
//! `namespace ++ salt`, where the namespace is the owning access group's
//! id bytes. Key servers authorize a requester for an identifier only if
//! it carries the namespace prefix of a group the requester belongs to,
//! so the identifier must be fixed *before* encryption and never changes
//! afterward.

use serde::{Deserialize, Serialize};
use std::fmt;

use rand::RngCore;

use crate::error::{CoreError, Result};
use crate::types::ObjectId;

/// Length in bytes of the salt appended to the namespace.
pub const SALT_LEN: usize = 5;

/// The salt portion of a document identifier.
pub type Salt = [u8; SALT_LEN];

/// The byte prefix owned by an access group.
///
/// A group's namespace is its object id: owning the group means owning
/// every identifier under that prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(pub [u8; 32]);

impl Namespace {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<ObjectId> for Namespace {
    fn from(id: ObjectId) -> Self {
        Self(id.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", &self.to_hex()[..16])
    }
}

/// A namespace-prefixed document identifier.
///
/// This is the identity string a document is encrypted under. It is
/// `namespace ++ salt` and is immutable once encryption has happened.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Vec<u8>);

impl DocumentId {
    /// Assemble an identifier from its parts.
    pub fn new(namespace: &Namespace, salt: &Salt) -> Self {
        let mut bytes = Vec::with_capacity(32 + SALT_LEN);
        bytes.extend_from_slice(namespace.as_bytes());
        bytes.extend_from_slice(salt);
        Self(bytes)
    }

    /// Get the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from a hex string. The identifier must be at least as long
    /// as a namespace.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() < 32 {
            return Err(CoreError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Whether this identifier falls under the given namespace.
    pub fn starts_with(&self, namespace: &Namespace) -> bool {
        self.0.starts_with(namespace.as_bytes())
    }

    /// The first 32 bytes: the namespace this identifier claims.
    pub fn namespace_prefix(&self) -> Namespace {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&self.0[..32]);
        Namespace(arr)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for DocumentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Derive a fresh random identifier under a group's namespace.
///
/// The salt is `SALT_LEN` random bytes, fresh per document. The result
/// must be fixed before encryption; calling this again produces an
/// unrelated identifier.
pub fn derive_random(namespace: &Namespace) -> (DocumentId, Salt) {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    (DocumentId::new(namespace, &salt), salt)
}

/// Derive a deterministic identifier under a group's namespace.
///
/// The salt is the truncated hash of the correlation id and the *sorted*
/// set of public keys, so independent callers with the same inputs
/// converge on the same identifier without coordination. Key order does
/// not affect the result.
///
/// Identifiers from unrelated groups can never collide even when salts
/// do: the 32-byte namespace prefix differs.
pub fn derive_deterministic(
    namespace: &Namespace,
    correlation_id: &str,
    public_keys: &[Vec<u8>],
) -> Result<(DocumentId, Salt)> {
    if correlation_id.is_empty() {
        return Err(CoreError::ConfigurationError(
            "correlation id must not be empty".into(),
        ));
    }

    let mut sorted: Vec<&Vec<u8>> = public_keys.iter().collect();
    sorted.sort();

    let mut hasher = blake3::Hasher::new_derive_key("sealbox-document-salt-v0");
    hasher.update(correlation_id.as_bytes());
    for key in sorted {
        // Length-prefix each key so concatenations cannot alias.
        hasher.update(&(key.len() as u32).to_le_bytes());
        hasher.update(key);
    }

    let digest = hasher.finalize();
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest.as_bytes()[..SALT_LEN]);

    Ok((DocumentId::new(namespace, &salt), salt))
}
