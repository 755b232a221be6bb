//! Document Co-Signer error type.

use cosign_core::{CanonicalizationError, DeadlineExceeded, DocumentId, ErrorKind, ValidationError};
use cosign_crypto::CryptoError;
use cosign_registry::RegistryError;
use cosign_store::StorageError;
use cosign_zkp::{ProofError, VerifyError};
use thiserror::Error;

/// Document Co-Signer errors.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// An identifier is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No document with this id.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// No signature by this signer on this document.
    #[error("no signature by {pseudonym} on document {document_id}")]
    SignatureNotFound {
        /// The document.
        document_id: DocumentId,
        /// The signer.
        pseudonym: String,
    },

    /// The pseudonym is unknown or its KYC status is not verified.
    #[error("signer not verified: {0}")]
    SignerNotVerified(String),

    /// The pseudonym is not a required signer of the document.
    #[error("signer {pseudonym} is not a required signer of document {document_id}")]
    SignerNotAuthorized {
        /// The document.
        document_id: DocumentId,
        /// The signer.
        pseudonym: String,
    },

    /// The signing key is not the signer's registered key.
    #[error("signing key does not match the key registered for {0}")]
    SignerKeyMismatch(String),

    /// The document is already fully signed.
    #[error("document {0} is already signed")]
    AlreadySigned(DocumentId),

    /// Stored document state contradicts itself.
    #[error("document invariant violated: {0}")]
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

    /// Signer lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Signature verification failed on malformed key material.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Signature payload could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Storage failed or timed out.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DocumentError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Canonicalization(_) => ErrorKind::InvalidFormat,
            Self::DocumentNotFound(_) | Self::SignatureNotFound { .. } => ErrorKind::NotFound,
            Self::SignerNotVerified(_)
            | Self::SignerNotAuthorized { .. }
            | Self::SignerKeyMismatch(_) => ErrorKind::Unauthorized,
            Self::AlreadySigned(_) => ErrorKind::Conflict,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::OracleTimeout(_) => ErrorKind::UpstreamFailure,
            Self::Proof(e) => e.kind(),
            Self::Verify(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }

    /// Whether the caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
