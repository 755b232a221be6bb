//! Storage error type.

use cosign_core::{DeadlineExceeded, ErrorKind};
use thiserror::Error;

/// Errors from the Storage boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend unreachable or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Operation did not complete within its deadline.
    #[error("storage timeout: {0}")]
    Timeout(#[from] DeadlineExceeded),

    /// A record or patch is not a JSON object, or could not be encoded.
    #[error("invalid record for {collection}: {reason}")]
    InvalidRecord {
        /// Target collection.
        collection: String,
        /// What was wrong.
        reason: String,
    },

    /// A stored record does not decode into its expected type.
    #[error("corrupt record {collection}/{id}: {reason}")]
    Corrupt {
        /// Collection holding the record.
        collection: String,
        /// Record id.
        id: String,
        /// Decode failure.
        reason: String,
    },
}

impl StorageError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => ErrorKind::UpstreamFailure,
            Self::InvalidRecord { .. } => ErrorKind::InvalidFormat,
            Self::Corrupt { .. } => ErrorKind::InvariantViolation,
        }
    }

    /// Whether the caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
