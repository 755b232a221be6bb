//! # cosign-zkp: Proof Oracle Boundary
//!
//! The core treats the zero-knowledge proof system as an external oracle:
//!
//! - [`ProofOracle`]: async `generate_proof` / `verify_proof`.
//! - [`ProofPayload`]: the closed set of statements the core asks for (KYC
//!   claims, pseudonym bindings, document signatures).
//! - [`KycClaim`] / [`ClaimType`] / [`KycLevel`]: typed identity claims.
//! - [`MockProofOracle`]: deterministic keyed mock for development and tests.
//!
//! Real backends implement [`ProofOracle`] in their own crates.

pub mod claims;
pub mod mock;
pub mod payload;
pub mod proof;
pub mod traits;

pub use claims::{AgeClaim, ClaimType, EmailClaim, IdentityClaim, KycClaim, KycLevel, ResidencyClaim};
pub use mock::MockProofOracle;
pub use payload::{DidControl, ProofPayload};
pub use proof::{Proof, ProofStatement};
pub use traits::{ProofError, ProofOracle, VerifyError};
