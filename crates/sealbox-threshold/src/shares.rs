//! Shamir split/combine of the 32-byte content key over GF(256).
//!
//! Each byte of the key is shared independently: a random degree-(t-1)
//! polynomial with the key byte as constant term, evaluated at
//! x = 1..=n. Reconstruction is Lagrange interpolation at x = 0 from
//! any t shares with distinct indices.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::ContentKey;
use crate::error::{Result, ThresholdError};

/// One share of a split content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    /// Share index in `1..=n`. The x-coordinate; never zero.
    pub index: u8,
    /// One byte of polynomial evaluation per key byte.
    pub value: [u8; 32],
}

impl KeyShare {
    /// Serialize to the 33-byte wire form (index || value).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        out.push(self.index);
        out.extend_from_slice(&self.value);
        out
    }

    /// Parse the 33-byte wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 || bytes[0] == 0 {
            return Err(ThresholdError::DecryptionError(
                "malformed key share".into(),
            ));
        }
        let mut value = [0u8; 32];
        value.copy_from_slice(&bytes[1..]);
        Ok(Self {
            index: bytes[0],
            value,
        })
    }
}

/// Split a content key into `n` shares with threshold `t`.
///
/// `1 <= t <= n <= 255`. With t = 1 every share is the key itself
/// (degree-0 polynomial), which is the single-server configuration.
pub fn split(key: &ContentKey, threshold: u8, count: usize) -> Result<Vec<KeyShare>> {
    if threshold == 0 || count == 0 || usize::from(threshold) > count || count > 255 {
        return Err(ThresholdError::InvalidThreshold {
            threshold,
            servers: count,
        });
    }

    let t = usize::from(threshold);
    let mut rng = rand::thread_rng();

    // coeffs[0] is the secret; higher coefficients are random.
    let mut coeffs: Vec<[u8; 32]> = Vec::with_capacity(t);
    coeffs.push(*key.as_bytes());
    for _ in 1..t {
        let mut c = [0u8; 32];
        rng.fill_bytes(&mut c);
        coeffs.push(c);
    }

    let mut shares = Vec::with_capacity(count);
    for i in 1..=count {
        let x = i as u8;
        let mut value = [0u8; 32];
        for (b, byte) in value.iter_mut().enumerate() {
            // Horner evaluation at x.
            let mut acc = 0u8;
            for coeff in coeffs.iter().rev() {
                acc = gf256_add(gf256_mul(acc, x), coeff[b]);
            }
            *byte = acc;
        }
        shares.push(KeyShare { index: x, value });
    }
    Ok(shares)
}

/// Reconstruct the content key from at least `t` shares.
///
/// Indices must be distinct; duplicates or fewer than `t` shares fail
/// `InsufficientShares`.
pub fn combine(threshold: u8, shares: &[KeyShare]) -> Result<ContentKey> {
    let t = usize::from(threshold);
    if t == 0 {
        return Err(ThresholdError::InvalidThreshold {
            threshold,
            servers: shares.len(),
        });
    }
    if shares.len() < t {
        return Err(ThresholdError::InsufficientShares {
            got: shares.len(),
            need: t,
        });
    }

    let selected = &shares[..t];
    for (i, a) in selected.iter().enumerate() {
        if a.index == 0 {
            return Err(ThresholdError::DecryptionError("share index zero".into()));
        }
        for b in &selected[i + 1..] {
            if a.index == b.index {
                return Err(ThresholdError::InsufficientShares {
                    got: t - 1,
                    need: t,
                });
            }
        }
    }

    let mut secret = [0u8; 32];
    for (b, byte) in secret.iter_mut().enumerate() {
        let mut acc = 0u8;
        for (i, share) in selected.iter().enumerate() {
            // Lagrange basis at 0; subtraction is XOR in char 2.
            let mut num = 1u8;
            let mut den = 1u8;
            for (j, other) in selected.iter().enumerate() {
                if i == j {
                    continue;
                }
                num = gf256_mul(num, other.index);
                den = gf256_mul(den, gf256_add(other.index, share.index));
            }
            let basis = gf256_mul(num, gf256_inv(den));
            acc = gf256_add(acc, gf256_mul(basis, share.value[b]));
        }
        *byte = acc;
    }
    Ok(ContentKey::from_bytes(secret))
}

// GF(2^8) with irreducible polynomial x^8 + x^4 + x^3 + x + 1 (0x11b).

#[inline]
fn gf256_add(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
fn gf256_mul(mut a: u8, mut b: u8) -> u8 {
    let mut p: u8 = 0;
    for _ in 0..8 {
        if (b & 1) != 0 {
            p ^= a;
        }
        let hi = a & 0x80;
        a <<= 1;
        if hi != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    p
}

#[inline]
fn gf256_pow(mut a: u8, mut e: u16) -> u8 {
    let mut r: u8 = 1;
    while e > 0 {
        if (e & 1) == 1 {
            r = gf256_mul(r, a);
        }
        a = gf256_mul(a, a);
        e >>= 1;
    }
    r
}

#[inline]
fn gf256_inv(a: u8) -> u8 {
    // a^254 for nonzero a; indices are validated nonzero and distinct
    // before any inversion, so the denominator is never zero.
    gf256_pow(a, 254)
}
