//! Keyed, domain-separated digests (HMAC-SHA-256).
//!
//! Used wherever an identifier must be recomputable by the key holder but
//! not invertible by anyone else, e.g. registry pseudonyms.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// `HMAC-SHA-256(key, domain ‖ 0x00 ‖ message)`.
///
/// The zero separator keeps `("a", "bc")` and `("ab", "c")` distinct.
pub fn keyed_digest(key: &[u8], domain: &str, message: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(format!("hmac key: {e}")))?;
    mac.update(domain.as_bytes());
    mac.update(&[0u8]);
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Constant-time check of a keyed digest.
pub fn verify_keyed_digest(
    key: &[u8],
    domain: &str,
    message: &[u8],
    expected: &[u8],
) -> Result<bool, CryptoError> {
    let actual = keyed_digest(key, domain, message)?;
    Ok(actual[..].ct_eq(expected).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = keyed_digest(b"salt", "cosign/test", b"did:midnight:abc").unwrap();
        let b = keyed_digest(b"salt", "cosign/test", b"did:midnight:abc").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_output() {
        let a = keyed_digest(b"salt-a", "d", b"m").unwrap();
        let b = keyed_digest(b"salt-b", "d", b"m").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn domain_is_separated_from_message() {
        let a = keyed_digest(b"k", "a", b"bc").unwrap();
        let b = keyed_digest(b"k", "ab", b"c").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_roundtrip() {
        let d = keyed_digest(b"k", "d", b"m").unwrap();
        assert!(verify_keyed_digest(b"k", "d", b"m", &d).unwrap());
        assert!(!verify_keyed_digest(b"k", "d", b"n", &d).unwrap());
        assert!(!verify_keyed_digest(b"k", "d", b"m", &d[..16]).unwrap());
    }
}
