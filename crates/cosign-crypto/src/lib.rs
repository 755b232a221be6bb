//! # cosign-crypto: Key Manager
//!
//! Cryptographic building blocks for the co-signing stack:
//!
//! - **Ed25519** key generation, signing and verification.
//! - **Addresses** derived deterministically from public keys, used as DID
//!   identifiers.
//! - **Keyed digests** (HMAC-SHA-256) for non-invertible pseudonyms.
//!
//! ## Crate Policy
//!
//! - Depends only on `cosign-core` internally.
//! - Stateless: no locking, safe to call from any task.
//! - No mocking of cryptographic operations in tests.

pub mod address;
pub mod ed25519;
pub mod error;
pub mod keyed;

pub use address::{derive_address, Address};
pub use ed25519::{
    public_key_from_private, sign, verify, verify_canonical, KeyPair, PublicKey, Signature,
};
pub use error::CryptoError;
pub use keyed::{keyed_digest, verify_keyed_digest};
