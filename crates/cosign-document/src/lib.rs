//! # cosign-document: Document Co-Signer
//!
//! A document lists required signers by pseudonym and becomes `SIGNED` in
//! the same transaction that stores the last required signature.
//!
//! - [`DocumentCoSigner`]: create, add required signers, sign, verify,
//!   audit.
//! - [`Document`], [`SignatureData`], [`AttemptLog`]: stored records.

pub mod cosigner;
pub mod error;
pub mod records;

pub use cosigner::{
    DocumentCoSigner, SignatureAudit, SigningPayload, DEFAULT_ORACLE_TIMEOUT,
    DEFAULT_STORAGE_TIMEOUT,
};
pub use error::DocumentError;
pub use records::{
    AttemptLog, AttemptOutcome, Document, DocumentStatus, SignatureAttempt, SignatureData,
};
