//! Binding-signature shapes.
//!
//! Upstream signers deliver the session-binding signature in one of two
//! encodings: the raw 64 signature bytes, or a JSON object wrapping a
//! hex-encoded `signature` field. The shape is resolved once here, at
//! the process boundary; the session authority only ever sees a
//! normalized [`Ed25519Signature`].

use serde::Deserialize;

use sealbox_core::Ed25519Signature;

use crate::error::{Result, SessionError};

/// A binding signature as received from the primary-credential signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureInput {
    /// The raw 64-byte signature.
    Raw(Ed25519Signature),
    /// A wrapped structure carrying the signature in a named field.
    Wrapped { signature: Ed25519Signature },
}

#[derive(Deserialize)]
struct WrappedShape {
    signature: String,
}

impl SignatureInput {
    /// Resolve incoming bytes to one of the two accepted shapes.
    ///
    /// Exactly 64 bytes are taken as a raw signature; otherwise the
    /// bytes must parse as a JSON object with a hex `signature` field.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() == 64 {
            let sig = Ed25519Signature::try_from_slice(bytes)?;
            return Ok(SignatureInput::Raw(sig));
        }

        let wrapped: WrappedShape = serde_json::from_slice(bytes).map_err(|_| {
            SessionError::InvalidSignature(
                "neither a raw 64-byte signature nor a wrapped {signature} object".into(),
            )
        })?;

        let sig_bytes = hex::decode(wrapped.signature.trim_start_matches("0x"))
            .map_err(|e| SessionError::InvalidSignature(format!("wrapped signature hex: {e}")))?;
        let sig = Ed25519Signature::try_from_slice(&sig_bytes)?;
        Ok(SignatureInput::Wrapped { signature: sig })
    }

    /// Normalize to the underlying signature.
    pub fn into_signature(self) -> Ed25519Signature {
        match self {
            SignatureInput::Raw(sig) => sig,
            SignatureInput::Wrapped { signature } => signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::Keypair;

    #[test]
    fn test_raw_shape() {
        let sig = Keypair::generate().sign(b"msg");
        let parsed = SignatureInput::parse(sig.as_bytes()).unwrap();
        assert_eq!(parsed.into_signature(), sig);
    }

    #[test]
    fn test_wrapped_shape() {
        let sig = Keypair::generate().sign(b"msg");
        let json = format!(r#"{{"signature":"{}"}}"#, sig.to_hex());
        let parsed = SignatureInput::parse(json.as_bytes()).unwrap();
        assert!(matches!(parsed, SignatureInput::Wrapped { .. }));
        assert_eq!(parsed.into_signature(), sig);
    }

    #[test]
    fn test_wrapped_shape_with_prefix() {
        let sig = Keypair::generate().sign(b"msg");
        let json = format!(r#"{{"signature":"0x{}"}}"#, sig.to_hex());
        let parsed = SignatureInput::parse(json.as_bytes()).unwrap();
        assert_eq!(parsed.into_signature(), sig);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(SignatureInput::parse(b"not a signature").is_err());
        assert!(SignatureInput::parse(br#"{"other":"field"}"#).is_err());
        // 63 bytes: neither shape.
        assert!(SignatureInput::parse(&[0u8; 63]).is_err());
    }
}
