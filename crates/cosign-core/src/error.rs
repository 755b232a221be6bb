//! # Error Taxonomy
//!
//! Structured error types shared by every crate in the stack, built with
//! `thiserror`. No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each component crate defines its own error enum and classifies every
//! variant into an [`ErrorKind`]. Callers branch on the kind, never on
//! message text:
//!
//! | Kind | Detected | Side effects |
//! |---|---|---|
//! | `InvalidFormat` | before any I/O | none |
//! | `NotFound` | read path | none |
//! | `Conflict` | inside the enforcing transaction | rolled back |
//! | `Unauthorized` | before any mutation | none |
//! | `UpstreamFailure` | Storage / Proof Oracle call | rolled back, retryable |
//! | `InvariantViolation` | logic defect | transaction aborted |

use thiserror::Error;

/// Classification of a failure, shared across all component errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input (DID syntax, hex, key material, message).
    InvalidFormat,
    /// A DID, document, pseudonym or record is absent.
    NotFound,
    /// Uniqueness or concurrency conflict detected inside a transaction.
    Conflict,
    /// Caller is not eligible for the operation.
    Unauthorized,
    /// Storage or Proof Oracle unavailable, failed or timed out.
    UpstreamFailure,
    /// A cross-record invariant was found broken. Indicates a defect.
    InvariantViolation,
}

impl ErrorKind {
    /// Stable lowercase identifier for logs and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::UpstreamFailure => "upstream_failure",
            Self::InvariantViolation => "invariant_violation",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only upstream failures are transient. Registration and signing are
    /// idempotent, so a retry after an ambiguous upstream failure is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifier newtypes and encodings.
///
/// Always raised before any I/O; always [`ErrorKind::InvalidFormat`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// DID does not conform to `did:<method>:<identifier>`.
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// Pseudonym does not conform to `sig_<alphanumeric>`.
    #[error("invalid pseudonym: \"{0}\" (expected sig_<alphanumeric>)")]
    InvalidPseudonym(String),

    /// Document identifier is not a UUID.
    #[error("invalid document id: \"{0}\"")]
    InvalidDocumentId(String),

    /// Hex string is malformed.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Timestamp string is not RFC 3339 UTC.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Always [`ErrorKind::InvalidFormat`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidFormat
    }
}
