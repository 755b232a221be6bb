//! Shared harness for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cosign_core::{Did, Pseudonym};
use cosign_crypto::{derive_address, KeyPair};
use cosign_registry::{RegistrationRequest, RegistrySalt};
use cosign_service::{CosignConfig, CosignService};
use cosign_store::MemoryStore;
use cosign_zkp::{
    ClaimType, EmailClaim, IdentityClaim, KycClaim, MockProofOracle, Proof, ProofOracle,
    ProofPayload,
};

pub const ORACLE_SECRET: [u8; 32] = [0x5a; 32];

pub struct Harness {
    pub store: MemoryStore,
    pub oracle: Arc<MockProofOracle>,
    pub service: CosignService,
}

pub fn config() -> CosignConfig {
    CosignConfig::new("midnight", RegistrySalt::new([0x17; 32])).unwrap()
}

pub async fn harness() -> Harness {
    harness_with(MemoryStore::new(), MockProofOracle::new(ORACLE_SECRET), config()).await
}

pub async fn harness_with(
    store: MemoryStore,
    oracle: MockProofOracle,
    config: CosignConfig,
) -> Harness {
    let oracle = Arc::new(oracle);
    let service = CosignService::open(config, Arc::new(store.clone()), oracle.clone())
        .await
        .unwrap();
    Harness {
        store,
        oracle,
        service,
    }
}

/// A fresh DID for a deterministic key.
pub async fn new_did(h: &Harness, seed: u8) -> (Did, KeyPair) {
    let kp = KeyPair::from_seed(&[seed; 32]);
    let pk = kp.public_key();
    let did = h
        .service
        .dids()
        .create_did(&derive_address(&pk), &pk)
        .await
        .unwrap();
    (did, kp)
}

/// Identity and email claim proofs for `did`, produced by an oracle sharing
/// the harness secret.
pub async fn standard_claims(did: &Did) -> BTreeMap<ClaimType, Proof> {
    let prover = MockProofOracle::new(ORACLE_SECRET);
    let mut proofs = BTreeMap::new();
    proofs.insert(
        ClaimType::Identity,
        prove(
            &prover,
            did,
            KycClaim::Identity(IdentityClaim::new("Grace Hopper", "P9988776", "US").unwrap()),
        )
        .await,
    );
    proofs.insert(
        ClaimType::Email,
        prove(
            &prover,
            did,
            KycClaim::Email(EmailClaim::new("grace@example.org").unwrap()),
        )
        .await,
    );
    proofs
}

pub async fn prove(oracle: &MockProofOracle, did: &Did, claim: KycClaim) -> Proof {
    oracle
        .generate_proof(&ProofPayload::Claim {
            subject: did.clone(),
            claim,
        })
        .await
        .unwrap()
        .redacted()
}

/// The pseudonym signing key a holder pairs with `did_key`. Never a DID key.
pub fn signing_key_for(did_key: &KeyPair) -> KeyPair {
    let mut seed = *did_key.seed();
    seed[0] ^= 0xa5;
    KeyPair::from_seed(&seed)
}

/// A registration where `did_key` vouches for [`signing_key_for`] it.
pub async fn request(h: &Harness, did: &Did, did_key: &KeyPair) -> RegistrationRequest {
    h.service
        .new_registration(
            did.clone(),
            did_key,
            signing_key_for(did_key).public_key(),
            standard_claims(did).await,
            "enc:v1",
        )
        .unwrap()
}

/// Create a DID and register it as a verified signer. Returns the
/// pseudonym's signing key, not the DID key.
pub async fn signer(h: &Harness, seed: u8) -> (Did, Pseudonym, KeyPair) {
    let (did, did_key) = new_did(h, seed).await;
    let reg = h
        .service
        .register_signer(request(h, &did, &did_key).await)
        .await
        .unwrap();
    (did, reg.pseudonym, signing_key_for(&did_key))
}

pub fn short(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
