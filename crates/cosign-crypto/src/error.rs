//! Cryptographic primitive error type.

use cosign_core::{CanonicalizationError, ErrorKind, ValidationError};
use thiserror::Error;

/// Errors from key handling, signing and verification.
///
/// A signature that is well-formed but does not verify is not an error:
/// [`verify`](crate::verify) returns `Ok(false)` for it.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Hex or byte encoding of key material or a signature is malformed.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Key bytes decode but do not form a usable key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Address string is not 40 lowercase hex characters.
    #[error("invalid address: \"{0}\"")]
    InvalidAddress(String),

    /// Signed payload could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl CryptoError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Canonicalization(_) => ErrorKind::InvalidFormat,
            Self::InvalidEncoding(_) | Self::InvalidKey(_) | Self::InvalidAddress(_) => {
                ErrorKind::InvalidFormat
            }
        }
    }
}

impl From<ValidationError> for CryptoError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidEncoding(err.to_string())
    }
}
