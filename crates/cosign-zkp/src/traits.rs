//! # Proof Oracle Trait
//!
//! The core's only view of the proof system. Implementations may be slow
//! and remote; callers always await them under a deadline.
//!
//! ## Security Invariant
//!
//! `Send + Sync` so one oracle can serve concurrent registrations and
//! signings. Proof generation and verification have no side effects the
//! core relies on.

use async_trait::async_trait;
use cosign_core::ErrorKind;
use thiserror::Error;

use crate::payload::ProofPayload;
use crate::proof::Proof;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The payload's predicate does not hold; no proof exists for it.
    #[error("predicate unsatisfied for {statement}: {reason}")]
    PredicateUnsatisfied {
        /// Statement that was requested.
        statement: String,
        /// Why the predicate failed.
        reason: String,
    },
    /// Payload inputs could not be encoded for proving.
    #[error("witness error: {0}")]
    WitnessError(String),
    /// The oracle is unreachable or failed internally.
    #[error("proof oracle unavailable: {0}")]
    Unavailable(String),
}

impl ProofError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PredicateUnsatisfied { .. } => ErrorKind::Unauthorized,
            Self::WitnessError(_) => ErrorKind::InvalidFormat,
            Self::Unavailable(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Error during proof verification. A proof that simply does not verify is
/// `Ok(false)`, not an error.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof's public inputs cannot be encoded.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The oracle is unreachable or failed internally.
    #[error("proof oracle unavailable: {0}")]
    Unavailable(String),
}

impl VerifyError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedProof(_) => ErrorKind::InvalidFormat,
            Self::Unavailable(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// External zero-knowledge proof oracle.
#[async_trait]
pub trait ProofOracle: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Prove the payload's predicate without revealing its private inputs.
    async fn generate_proof(&self, payload: &ProofPayload) -> Result<Proof, ProofError>;

    /// Check a proof using only its public half.
    async fn verify_proof(&self, proof: &Proof) -> Result<bool, VerifyError>;
}
