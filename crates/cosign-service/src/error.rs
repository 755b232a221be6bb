//! Service facade error type.

use cosign_core::{ErrorKind, ValidationError};
use cosign_crypto::CryptoError;
use cosign_did::DidError;
use cosign_document::DocumentError;
use cosign_registry::RegistryError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by [`crate::CosignService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request field is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Key material is malformed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// DID Manager failure.
    #[error(transparent)]
    Did(#[from] DidError),

    /// Signer Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Document Co-Signer failure.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The tracing subscriber could not be installed.
    #[error("tracing initialization failed: {0}")]
    Telemetry(String),
}

impl ServiceError {
    /// Taxonomy classification, forwarded from the component error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::Validation(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Did(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Document(e) => e.kind(),
            Self::Telemetry(_) => ErrorKind::InvariantViolation,
        }
    }

    /// Whether the caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
