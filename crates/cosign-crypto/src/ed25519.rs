//! # Ed25519 Keys, Signing and Verification
//!
//! ## Security Invariant
//!
//! - Private keys are never serialized or logged. [`KeyPair`] does not
//!   implement `Serialize`, its `Debug` prints `KeyPair(<private>)`, and the
//!   dalek signing key zeroizes itself on drop.
//! - Exported seeds are returned in [`Zeroizing`] buffers.
//! - Verification uses `verify_strict`, rejecting malleable and small-order
//!   signatures.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings.

use cosign_core::CanonicalBytes;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Length of an Ed25519 seed.
pub const SEED_LENGTH: usize = 32;
/// Length of the seed‖public keypair encoding.
pub const KEYPAIR_LENGTH: usize = 64;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

/// An Ed25519 key pair, owned by the participant process.
pub struct KeyPair {
    signing_key: SigningKey,
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

impl PublicKey {
    /// Wrap raw public key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        cosign_core::hex::encode(&self.0)
    }

    /// Parse a 64-character hex string.
    ///
    /// Fails with [`CryptoError::InvalidEncoding`] on non-hex characters,
    /// odd length or a length other than 32 bytes.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = cosign_core::hex::decode_array::<32>(hex)?;
        Ok(Self(bytes))
    }

    /// Constant-time comparison, for checks against registered keys.
    pub fn ct_eq(&self, other: &PublicKey) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }

    fn to_verifying_key(self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidKey(format!("public key is not a curve point: {e}")))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice, which must be exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidEncoding(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex rendering (128 characters).
    pub fn to_hex(&self) -> String {
        cosign_core::hex::encode(&self.0)
    }

    /// Parse a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = cosign_core::hex::decode_array::<64>(hex)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

impl KeyPair {
    /// Generate a fresh key pair from the operating system CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Deterministic key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load private key material in either accepted form.
    ///
    /// - 32 bytes: the seed.
    /// - 64 bytes: seed followed by the public key. The public half must
    ///   match the key derived from the seed.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, CryptoError> {
        match secret.len() {
            SEED_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
                seed.copy_from_slice(secret);
                Ok(Self::from_seed(&seed))
            }
            KEYPAIR_LENGTH => {
                let mut bytes = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                bytes.copy_from_slice(secret);
                let signing_key = SigningKey::from_keypair_bytes(&bytes).map_err(|_| {
                    CryptoError::InvalidKey("public half does not match seed".to_string())
                })?;
                Ok(Self { signing_key })
            }
            n => Err(CryptoError::InvalidKey(format!(
                "private key must be {SEED_LENGTH} or {KEYPAIR_LENGTH} bytes, got {n}"
            ))),
        }
    }

    /// The paired public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Export the 32-byte seed for the participant's own key storage.
    pub fn seed(&self) -> Zeroizing<[u8; SEED_LENGTH]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Sign an arbitrary byte message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Sign canonical bytes. Structured payloads go through this path so that
    /// the audit side can rebuild the exact signed bytes.
    pub fn sign_canonical(&self, data: &CanonicalBytes) -> Signature {
        self.sign(data.as_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Sign `message` with raw private key material (32 or 64 bytes).
///
/// Malformed key material fails before any signing happens.
pub fn sign(message: &[u8], private_key: &[u8]) -> Result<Signature, CryptoError> {
    Ok(KeyPair::from_secret_bytes(private_key)?.sign(message))
}

/// Verify `signature` over exactly `message` under `public_key`.
///
/// Returns `Ok(false)` for a signature that does not verify. Returns
/// `Err(CryptoError::InvalidKey)` if `public_key` is not a valid point.
pub fn verify(
    message: &[u8],
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<bool, CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    Ok(vk.verify_strict(message, &sig).is_ok())
}

/// [`verify`] over canonical bytes.
pub fn verify_canonical(
    data: &CanonicalBytes,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<bool, CryptoError> {
    verify(data.as_bytes(), signature, public_key)
}

/// Derive the public key from raw private key material. Pure and
/// deterministic.
pub fn public_key_from_private(private_key: &[u8]) -> Result<PublicKey, CryptoError> {
    Ok(KeyPair::from_secret_bytes(private_key)?.public_key())
}

fn hex_prefix(bytes: &[u8]) -> String {
    cosign_core::hex::encode(&bytes[..bytes.len().min(4)])
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sign_verify_roundtrip(seed in any::<[u8; 32]>(), msg in prop::collection::vec(any::<u8>(), 0..256)) {
            let kp = KeyPair::from_seed(&seed);
            let sig = kp.sign(&msg);
            prop_assert!(verify(&msg, &sig, &kp.public_key()).unwrap());
        }

        #[test]
        fn single_bit_flip_in_message_fails(
            seed in any::<[u8; 32]>(),
            msg in prop::collection::vec(any::<u8>(), 1..128),
            bit in any::<prop::sample::Index>(),
        ) {
            let kp = KeyPair::from_seed(&seed);
            let sig = kp.sign(&msg);
            let mut flipped = msg.clone();
            let i = bit.index(msg.len() * 8);
            flipped[i / 8] ^= 1 << (i % 8);
            prop_assert!(!verify(&flipped, &sig, &kp.public_key()).unwrap());
        }

        #[test]
        fn single_bit_flip_in_signature_fails(
            seed in any::<[u8; 32]>(),
            msg in prop::collection::vec(any::<u8>(), 0..128),
            bit in 0usize..512,
        ) {
            let kp = KeyPair::from_seed(&seed);
            let mut raw = *kp.sign(&msg).as_bytes();
            raw[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(!verify(&msg, &Signature::from_bytes(raw), &kp.public_key()).unwrap());
        }
    }
}
