#![deny(missing_docs)]

//! # cosign-core: Foundational Types for the Co-Signing Stack
//!
//! Every other crate in the workspace depends on `cosign-core`; it depends on
//! nothing internal.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** [`Did`], [`Pseudonym`] and
//!    [`DocumentId`] are distinct types validated at construction. A pseudonym
//!    cannot be passed where a DID is expected.
//!
//! 2. **[`CanonicalBytes`] is the sole path to signing and hashing.** Every
//!    signed payload and every content digest flows through
//!    `CanonicalBytes::new()`, so signer and verifier always agree on bytes.
//!
//! 3. **One error taxonomy.** [`ErrorKind`] classifies every crate-level error
//!    into the six categories callers act on (format, not-found, conflict,
//!    unauthorized, upstream, invariant).
//!
//! 4. **Bounded external calls.** [`deadline::within`] wraps every Storage and
//!    Proof Oracle call in a caller-supplied timeout.

pub mod canonical;
pub mod deadline;
pub mod digest;
pub mod error;
pub mod hex;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use deadline::DeadlineExceeded;
pub use digest::{sha256_digest, sha256_hex, sha256_raw, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ErrorKind, ValidationError};
pub use identity::{Did, DocumentId, Pseudonym};
pub use temporal::Timestamp;
