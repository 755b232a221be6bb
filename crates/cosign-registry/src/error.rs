//! Signer Registry error type.

use cosign_core::{CanonicalizationError, DeadlineExceeded, ErrorKind, ValidationError};
use cosign_crypto::CryptoError;
use cosign_did::DidError;
use cosign_store::StorageError;
use cosign_zkp::{ProofError, VerifyError};
use thiserror::Error;

/// Signer Registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A pseudonym, salt or request field is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Registry salt is not 32 bytes of hex.
    #[error("invalid registry salt: {0}")]
    InvalidSalt(String),

    /// An identity proof was missing, mismatched or did not verify.
    #[error("KYC verification failed: {0}")]
    KycVerificationFailed(String),

    /// The DID control key is not an authentication key of the DID.
    #[error("DID control key is not an authentication method of the DID")]
    KeyNotInDidDocument,

    /// The DID control signature does not vouch for the signing key.
    #[error("DID control proof rejected: {0}")]
    DidControlInvalid(String),

    /// The signing key is a DID key or derives the DID's identifier.
    #[error("signing key is linkable to the DID")]
    SigningKeyLinkable,

    /// The pseudonym is already bound to a different DID.
    #[error("pseudonym {0} is bound to another identity")]
    PseudonymCollision(String),

    /// The DID is already bound to a different pseudonym.
    #[error("DID is already registered under another pseudonym")]
    DidAlreadyRegistered,

    /// No signer with this pseudonym.
    #[error("signer not found: {0}")]
    SignerNotFound(String),

    /// Stored registry state contradicts itself.
    #[error("registry invariant violated: {0}")]
    InvariantViolation(String),

    /// The proof oracle did not answer in time.
    #[error(transparent)]
    OracleTimeout(#[from] DeadlineExceeded),

    /// Proof generation failed.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// Proof verification could not run.
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// DID lookup failed or the DID is revoked.
    #[error(transparent)]
    Did(#[from] DidError),

    /// Keyed digest failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Payload could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Storage failed or timed out.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RegistryError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::InvalidSalt(_)
            | Self::Canonicalization(_)
            | Self::SigningKeyLinkable => ErrorKind::InvalidFormat,
            Self::KycVerificationFailed(_)
            | Self::KeyNotInDidDocument
            | Self::DidControlInvalid(_) => ErrorKind::Unauthorized,
            Self::PseudonymCollision(_) | Self::DidAlreadyRegistered => ErrorKind::Conflict,
            Self::SignerNotFound(_) => ErrorKind::NotFound,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::OracleTimeout(_) => ErrorKind::UpstreamFailure,
            Self::Proof(e) => e.kind(),
            Self::Verify(e) => e.kind(),
            Self::Did(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }

    /// Whether the caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
