//! # cosign-registry: Signer Registry
//!
//! Issues one pseudonym per KYC-verified DID and answers eligibility
//! queries about pseudonyms without revealing the DID behind them.
//!
//! Pseudonyms are keyed digests of the DID under a registry-private salt
//! ([`RegistrySalt`]). The pseudonym-DID bijection, the signer record and
//! the proof audit trail are written in one storage transaction.

pub mod error;
pub mod index;
pub mod pseudonym;
pub mod records;
pub mod registry;

pub use error::RegistryError;
pub use index::SignerIndex;
pub use pseudonym::RegistrySalt;
pub use records::{
    DidBinding, KycStatus, ProofEvent, PseudonymBinding, SignerProof, SignerProofLog, SignerView,
    VerifiedSigner,
};
pub use registry::{
    Registration, RegistrationOutcome, RegistrationRequest, SignerRegistry,
    DEFAULT_ORACLE_TIMEOUT, DEFAULT_STORAGE_TIMEOUT,
};
