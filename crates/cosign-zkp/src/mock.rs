//! # Mock Proof Oracle
//!
//! A deterministic oracle for development and testing. Proofs are keyed
//! digests, so only the holder of the oracle secret can mint or check them.
//!
//! ## How It Works
//!
//! ```text
//! commitment = HMAC(secret, "cosign/mock-commit/v1" ‖ canonical(private_inputs))
//! proof      = HMAC(secret, "cosign/mock-proof/v1"  ‖ canonical({statement, public_inputs, commitment}))
//! ```
//!
//! Verification recomputes `proof` from the public half and compares in
//! constant time.
//!
//! ## Security Warning
//!
//! **NOT ZERO-KNOWLEDGE.** The predicate is evaluated in the clear by the
//! oracle process. The commitment is keyed so that a stored proof does not
//! let a third party confirm a guessed witness.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cosign_core::CanonicalBytes;
use cosign_crypto::{keyed_digest, verify_keyed_digest};
use rand_core::{OsRng, RngCore};
use serde_json::{json, Value};
use zeroize::Zeroizing;

use crate::payload::ProofPayload;
use crate::proof::{Proof, ProofStatement};
use crate::traits::{ProofError, ProofOracle, VerifyError};

const COMMIT_DOMAIN: &str = "cosign/mock-commit/v1";
const PROOF_DOMAIN: &str = "cosign/mock-proof/v1";

/// Deterministic keyed mock oracle.
pub struct MockProofOracle {
    secret: Zeroizing<[u8; 32]>,
    latency: Option<Duration>,
    available: AtomicBool,
    generated: AtomicU64,
}

impl MockProofOracle {
    /// Oracle with a fixed secret. Two oracles with the same secret accept
    /// each other's proofs.
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            latency: None,
            available: AtomicBool::new(true),
            generated: AtomicU64::new(0),
        }
    }

    /// Oracle with a random secret.
    pub fn random() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(secret)
    }

    /// Delay every call, simulating a slow prover.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of proofs generated so far.
    pub fn proofs_generated(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), String> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("mock oracle switched off".to_string())
        }
    }

    fn proof_message(
        statement: ProofStatement,
        public_inputs: &Value,
        commitment: &[u8],
    ) -> Result<CanonicalBytes, String> {
        CanonicalBytes::new(&json!({
            "statement": statement,
            "public_inputs": public_inputs,
            "commitment": cosign_core::hex::encode(commitment),
        }))
        .map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for MockProofOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProofOracle")
            .field("secret", &"<redacted>")
            .field("latency", &self.latency)
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl ProofOracle for MockProofOracle {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate_proof(&self, payload: &ProofPayload) -> Result<Proof, ProofError> {
        self.simulate().await.map_err(ProofError::Unavailable)?;

        let statement = payload.statement();
        payload
            .check()
            .map_err(|reason| ProofError::PredicateUnsatisfied {
                statement: statement.to_string(),
                reason,
            })?;

        let public_inputs = payload.public_inputs();
        let private_inputs = payload.private_inputs();

        let private_bytes =
            CanonicalBytes::new(&private_inputs).map_err(|e| ProofError::WitnessError(e.to_string()))?;
        let commitment = keyed_digest(&self.secret[..], COMMIT_DOMAIN, private_bytes.as_bytes())
            .map_err(|e| ProofError::WitnessError(e.to_string()))?;
        let message = Self::proof_message(statement, &public_inputs, &commitment)
            .map_err(ProofError::WitnessError)?;
        let proof = keyed_digest(&self.secret[..], PROOF_DOMAIN, message.as_bytes())
            .map_err(|e| ProofError::WitnessError(e.to_string()))?;

        self.generated.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(oracle = "mock", statement = %statement, "proof generated");

        Ok(Proof {
            statement,
            proof: proof.to_vec(),
            commitment: commitment.to_vec(),
            public_inputs,
            private_inputs: Some(private_inputs),
        })
    }

    async fn verify_proof(&self, proof: &Proof) -> Result<bool, VerifyError> {
        self.simulate().await.map_err(VerifyError::Unavailable)?;

        let message = Self::proof_message(proof.statement, &proof.public_inputs, &proof.commitment)
            .map_err(VerifyError::MalformedProof)?;
        verify_keyed_digest(&self.secret[..], PROOF_DOMAIN, message.as_bytes(), &proof.proof)
            .map_err(|e| VerifyError::MalformedProof(e.to_string()))
    }
}
