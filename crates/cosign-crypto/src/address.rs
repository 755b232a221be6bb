//! Deterministic addresses derived from public keys.
//!
//! `address = hex(SHA-256(public_key)[0..20])`: 40 lowercase hex characters.
//! The DID Manager uses the address as the method-specific identifier, so a
//! DID is bound to the key that created it.

use serde::{Deserialize, Serialize};

use crate::ed25519::PublicKey;
use crate::error::CryptoError;

/// Number of digest bytes kept in an address.
pub const ADDRESS_BYTES: usize = 20;

/// A 40-character lowercase hex address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validate an address string.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let valid = s.len() == ADDRESS_BYTES * 2
            && s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(CryptoError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the address of a public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = cosign_core::sha256_raw(public_key.as_bytes());
    Address(cosign_core::hex::encode(&digest.bytes[..ADDRESS_BYTES]))
}
