//! DID Manager error type.

use cosign_core::{CanonicalizationError, ErrorKind, ValidationError};
use cosign_crypto::CryptoError;
use cosign_store::StorageError;
use thiserror::Error;

/// DID Manager errors.
#[derive(Error, Debug)]
pub enum DidError {
    /// Identifier does not match `did:<method>:<identifier>`.
    #[error(transparent)]
    InvalidDidFormat(#[from] ValidationError),

    /// Configured DID method name is not lowercase alphanumeric.
    #[error("invalid DID method \"{0}\"")]
    InvalidMethod(String),

    /// Address passed to create does not derive from the public key.
    #[error("address {address} does not derive from the supplied public key")]
    AddressMismatch {
        /// The address supplied.
        address: String,
    },

    /// Document breaks a structural invariant.
    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    /// Patch is malformed or targets a different DID.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// No DID with this identifier.
    #[error("DID not found: {0}")]
    NotFound(String),

    /// A DID with this identifier exists, active or revoked.
    #[error("DID already exists: {0}")]
    AlreadyExists(String),

    /// DID has been revoked.
    #[error("DID revoked: {0}")]
    Revoked(String),

    /// Patch was built against an older version of the document.
    #[error("stale patch: based on version {based_on}, current is {current}")]
    StaleVersion {
        /// Version the patch was built against.
        based_on: u64,
        /// Current stored version.
        current: u64,
    },

    /// Patch would remove the signing controller's own authentication key.
    #[error("patch would remove the signer's own authentication method {0}")]
    SelfLockout(String),

    /// Patch signer is not an authentication method of the document.
    #[error("patch signer is not an authentication method of {0}")]
    NotController(String),

    /// Patch signature does not verify.
    #[error("patch signature does not verify")]
    BadSignature,

    /// Key handling failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Signed payload could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Storage failed or timed out.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DidError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDidFormat(_)
            | Self::InvalidMethod(_)
            | Self::AddressMismatch { .. }
            | Self::InvalidDocument(_)
            | Self::InvalidPatch(_)
            | Self::Canonicalization(_) => ErrorKind::InvalidFormat,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_)
            | Self::Revoked(_)
            | Self::StaleVersion { .. }
            | Self::SelfLockout(_) => ErrorKind::Conflict,
            Self::NotController(_) | Self::BadSignature => ErrorKind::Unauthorized,
            Self::Crypto(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }

    /// Whether the caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
