//! Pseudonym derivation.
//!
//! `pseudonym = "sig_" + hex(HMAC-SHA-256(salt, "cosign/pseudonym/v1" ‖ 0x00 ‖ did))[0..40]`
//!
//! The salt never leaves the registry. Without it a pseudonym cannot be
//! linked to a DID, even by someone who can enumerate candidate DIDs. With
//! it, the registry recomputes the same pseudonym for the same DID.

use cosign_core::{Did, Pseudonym};
use cosign_crypto::keyed_digest;
use zeroize::Zeroizing;

use crate::error::RegistryError;

const PSEUDONYM_DOMAIN: &str = "cosign/pseudonym/v1";

/// Hex characters kept after the `sig_` prefix.
pub const PSEUDONYM_HEX_LEN: usize = 40;

/// The registry-private key for pseudonym derivation.
#[derive(Clone)]
pub struct RegistrySalt(Zeroizing<[u8; 32]>);

impl RegistrySalt {
    /// Wrap raw salt bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, RegistryError> {
        let bytes = cosign_core::hex::decode_array::<32>(hex.trim())
            .map_err(|e| RegistryError::InvalidSalt(e.to_string()))?;
        Ok(Self::new(bytes))
    }

    /// Derive the pseudonym for `did`.
    pub fn pseudonym_for(&self, did: &Did) -> Result<Pseudonym, RegistryError> {
        let digest = keyed_digest(&self.0[..], PSEUDONYM_DOMAIN, did.as_str().as_bytes())?;
        let hex = cosign_core::hex::encode(&digest);
        Ok(Pseudonym::new(format!(
            "{}{}",
            Pseudonym::PREFIX,
            &hex[..PSEUDONYM_HEX_LEN]
        ))?)
    }
}

impl std::fmt::Debug for RegistrySalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RegistrySalt(<redacted>)")
    }
}
