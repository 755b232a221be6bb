//! # Signer Registry
//!
//! Gates pseudonym issuance behind KYC proof verification and answers
//! "may this pseudonym sign" queries.
//!
//! ## Registration
//!
//! 1. The DID must be active. One of its authentication keys must sign for
//!    the pseudonym's signing key ([`DidControl`]).
//! 2. The signing key must not be linkable to the DID: it may not appear in
//!    the DID document and its address may not be the DID's identifier.
//! 3. The pseudonym is derived from the DID with the registry salt.
//! 4. Every identity proof must attest to its claim type, name the DID as
//!    subject and verify with the oracle. The level's required claims must
//!    all be present.
//! 5. The oracle issues a binding proof for the pseudonym. The DID and the
//!    control signature are private inputs.
//! 6. One transaction re-checks the DID and the key, enforces the pseudonym-DID
//!    bijection, upserts the signer and appends to the proof log.
//!
//! Oracle work happens before the transaction opens, so the writer lock is
//! never held across an oracle call.
//!
//! ## Privacy
//!
//! Log events carry either a DID or a pseudonym, never both. The signing key
//! of a pseudonym is never a DID key, so stored signatures verify under no
//! key an outsider can find in a DID document.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cosign_core::deadline::within;
use cosign_core::{sha256_digest, CanonicalBytes, ContentDigest, Did, Pseudonym, Timestamp};
use cosign_crypto::{derive_address, PublicKey, Signature};
use cosign_did::{DidDocument, DidError, DidManager};
use cosign_store::{bounded, load, load_all, load_committed, save, Storage, Transaction};
use cosign_zkp::{
    ClaimType, DidControl, KycLevel, Proof, ProofOracle, ProofPayload, ProofStatement,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::RegistryError;
use crate::index::SignerIndex;
use crate::pseudonym::RegistrySalt;
use crate::records::{
    DidBinding, KycStatus, ProofEvent, PseudonymBinding, SignerProof, SignerProofLog, SignerView,
    VerifiedSigner,
};

/// Default bound on each storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on each oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// A request to register (or re-register) a signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// DID being verified.
    pub did: Did,
    /// Key the pseudonym will sign documents with. Fresh per pseudonym.
    pub signing_key: PublicKey,
    /// A DID authentication key vouching for `signing_key`.
    pub did_control: DidControl,
    /// One proof per claim type.
    pub identity_proofs: BTreeMap<ClaimType, Proof>,
    /// Opaque ciphertext stored with the signer.
    #[serde(default)]
    pub encrypted_details: String,
    /// Level the proofs must satisfy.
    pub kyc_level: KycLevel,
}

/// What a registration call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// New signer and pseudonym.
    Created,
    /// Existing signer updated.
    Reverified,
    /// Existing signer already in this state; nothing written.
    Unchanged,
}

impl RegistrationOutcome {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reverified => "reverified",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// The signer's pseudonym.
    pub pseudonym: Pseudonym,
    /// What changed.
    pub outcome: RegistrationOutcome,
    /// Hash of the latest binding proof in the signer's audit trail.
    pub proof_hash: ContentDigest,
}

/// The Signer Registry.
pub struct SignerRegistry {
    storage: Arc<dyn Storage>,
    dids: Arc<DidManager>,
    oracle: Arc<dyn ProofOracle>,
    salt: RegistrySalt,
    index: SignerIndex,
    storage_timeout: Duration,
    oracle_timeout: Duration,
}

impl std::fmt::Debug for SignerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerRegistry")
            .field("oracle", &self.oracle.name())
            .field("indexed", &self.index.len())
            .field("storage_timeout", &self.storage_timeout)
            .field("oracle_timeout", &self.oracle_timeout)
            .finish_non_exhaustive()
    }
}

impl SignerRegistry {
    /// Build a registry over its collaborators. The index starts empty;
    /// call [`SignerRegistry::rebuild_index`] after construction.
    pub fn new(
        storage: Arc<dyn Storage>,
        dids: Arc<DidManager>,
        oracle: Arc<dyn ProofOracle>,
        salt: RegistrySalt,
    ) -> Self {
        Self {
            storage,
            dids,
            oracle,
            salt,
            index: SignerIndex::new(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    /// Override the per-call timeouts.
    pub fn with_timeouts(mut self, storage: Duration, oracle: Duration) -> Self {
        self.storage_timeout = storage;
        self.oracle_timeout = oracle;
        self
    }

    /// The pseudonym cache.
    pub fn index(&self) -> &SignerIndex {
        &self.index
    }

    /// Register a signer, or re-register an existing one. Safe to retry.
    pub async fn register_signer(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, RegistryError> {
        let did = &request.did;

        let record = self.dids.resolve_record(did.as_str()).await?;
        if !record.is_active() {
            warn!(did = %did, "registration rejected: DID revoked");
            return Err(DidError::Revoked(did.to_string()).into());
        }
        if let Err(e) = Self::check_keys(&record.document, &request) {
            warn!(did = %did, error = %e, "registration rejected");
            return Err(e);
        }

        let pseudonym = self.salt.pseudonym_for(did)?;

        let claims_digest = match self.verify_identity_proofs(&request).await {
            Ok(digest) => digest,
            Err(e) => {
                warn!(did = %did, error = %e, "registration rejected");
                return Err(e);
            }
        };

        let binding = ProofPayload::SignerBinding {
            subject: did.clone(),
            control: request.did_control.clone(),
            pseudonym: pseudonym.clone(),
            signing_key: request.signing_key,
            kyc_level: request.kyc_level,
            claims_digest,
        };
        let proof = within(
            self.oracle_timeout,
            "oracle.generate_proof",
            self.oracle.generate_proof(&binding),
        )
        .await??
        .redacted();

        let mut tx = self.begin().await?;
        let applied = self.bind(tx.as_mut(), &request, &pseudonym, proof).await;
        let (outcome, view, proof_hash) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                self.abort(tx).await;
                return Err(e);
            }
        };

        if outcome == RegistrationOutcome::Unchanged {
            self.abort(tx).await;
            debug!(pseudonym = %pseudonym, "registration unchanged");
        } else {
            bounded(self.storage_timeout, "registry.commit", tx.commit()).await?;
            info!(pseudonym = %pseudonym, outcome = %outcome, level = %request.kyc_level, "signer registered");
        }
        self.index.put(view);

        Ok(Registration {
            pseudonym,
            outcome,
            proof_hash,
        })
    }

    /// Whether `pseudonym` belongs to a signer whose KYC status is verified.
    /// Unknown pseudonyms are `false`.
    pub async fn is_signer_verified(&self, pseudonym: &Pseudonym) -> Result<bool, RegistryError> {
        if let Some(view) = self.index.get(pseudonym) {
            return Ok(view.is_verified());
        }
        match self.signer_committed(pseudonym).await? {
            Some(view) => {
                let verified = view.is_verified();
                self.index.put(view);
                Ok(verified)
            }
            None => Ok(false),
        }
    }

    /// Whether the audit trail of `pseudonym` holds a proof with this hash.
    pub async fn verify_signer_proof(
        &self,
        pseudonym: &Pseudonym,
        proof_hash: &ContentDigest,
    ) -> Result<bool, RegistryError> {
        let log = bounded(
            self.storage_timeout,
            "registry.get",
            load_committed::<SignerProofLog>(self.storage.as_ref(), pseudonym.as_str()),
        )
        .await?;
        Ok(log.is_some_and(|log| log.contains(proof_hash)))
    }

    /// Whether `key` is the registered signing key of `pseudonym`.
    pub async fn signer_key_matches(
        &self,
        pseudonym: &Pseudonym,
        key: &PublicKey,
    ) -> Result<bool, RegistryError> {
        Ok(self.signer_public_key(pseudonym).await?.ct_eq(key))
    }

    /// Whether `signature` over `message` verifies under the registered
    /// signing key of `pseudonym`.
    pub async fn verify_signer_signature(
        &self,
        pseudonym: &Pseudonym,
        message: &CanonicalBytes,
        signature: &Signature,
    ) -> Result<bool, RegistryError> {
        let key = self.signer_public_key(pseudonym).await?;
        Ok(cosign_crypto::verify_canonical(message, signature, &key)?)
    }

    async fn signer_public_key(
        &self,
        pseudonym: &Pseudonym,
    ) -> Result<PublicKey, RegistryError> {
        self.signer_committed(pseudonym)
            .await?
            .map(|view| view.signing_key)
            .ok_or_else(|| RegistryError::SignerNotFound(pseudonym.to_string()))
    }

    /// The proof audit trail of a signer, oldest first. Empty when unknown.
    pub async fn signer_proofs(
        &self,
        pseudonym: &Pseudonym,
    ) -> Result<Vec<SignerProof>, RegistryError> {
        let log = bounded(
            self.storage_timeout,
            "registry.get",
            load_committed::<SignerProofLog>(self.storage.as_ref(), pseudonym.as_str()),
        )
        .await?;
        Ok(log.map(|log| log.entries).unwrap_or_default())
    }

    /// Record an administrative KYC outcome for a signer.
    pub async fn set_kyc_status(
        &self,
        pseudonym: &Pseudonym,
        status: KycStatus,
    ) -> Result<SignerView, RegistryError> {
        let mut tx = self.begin().await?;
        let mut signer = match self.signer_record_in(tx.as_mut(), pseudonym).await {
            Ok(Some(signer)) => signer,
            Ok(None) => {
                self.abort(tx).await;
                return Err(RegistryError::SignerNotFound(pseudonym.to_string()));
            }
            Err(e) => {
                self.abort(tx).await;
                return Err(e);
            }
        };

        if signer.kyc_status == status {
            self.abort(tx).await;
            return Ok(SignerView::from(&signer));
        }

        signer.kyc_status = status;
        signer.kyc_timestamp = Timestamp::now();
        bounded(self.storage_timeout, "registry.save", save(tx.as_mut(), &signer)).await?;
        bounded(self.storage_timeout, "registry.commit", tx.commit()).await?;

        let view = SignerView::from(&signer);
        self.index.put(view.clone());
        info!(pseudonym = %pseudonym, status = %status, "signer KYC status changed");
        Ok(view)
    }

    /// Signer view inside a caller's transaction, read from storage rather
    /// than the cache.
    pub async fn signer_in(
        &self,
        tx: &mut dyn Transaction,
        pseudonym: &Pseudonym,
    ) -> Result<Option<SignerView>, RegistryError> {
        Ok(self
            .signer_record_in(tx, pseudonym)
            .await?
            .map(|signer| SignerView::from(&signer)))
    }

    /// Replace the index with the committed contents of storage.
    pub async fn rebuild_index(&self) -> Result<usize, RegistryError> {
        let signers = bounded(
            self.storage_timeout,
            "registry.list",
            load_all::<VerifiedSigner>(self.storage.as_ref()),
        )
        .await?;
        let n = self.index.replace_all(signers.iter().map(SignerView::from));
        info!(signers = n, "signer index rebuilt");
        Ok(n)
    }

    fn check_keys(document: &DidDocument, request: &RegistrationRequest) -> Result<(), RegistryError> {
        let control = &request.did_control;
        if document.authentication_method_for(&control.key).is_none() {
            return Err(RegistryError::KeyNotInDidDocument);
        }
        control
            .verify(&request.did, &request.signing_key)
            .map_err(RegistryError::DidControlInvalid)?;
        Self::check_unlinkable(document, &request.signing_key)
    }

    fn check_unlinkable(document: &DidDocument, signing_key: &PublicKey) -> Result<(), RegistryError> {
        let listed = document
            .verification_method
            .iter()
            .any(|m| m.public_key_hex.ct_eq(signing_key));
        if listed || derive_address(signing_key).as_str() == document.id.method_specific_id() {
            return Err(RegistryError::SigningKeyLinkable);
        }
        Ok(())
    }

    async fn verify_identity_proofs(
        &self,
        request: &RegistrationRequest,
    ) -> Result<ContentDigest, RegistryError> {
        for required in request.kyc_level.required_claims() {
            if !request.identity_proofs.contains_key(required) {
                return Err(RegistryError::KycVerificationFailed(format!(
                    "{} level requires a {required} proof",
                    request.kyc_level
                )));
            }
        }

        let mut digests = BTreeMap::new();
        for (claim_type, proof) in &request.identity_proofs {
            if proof.statement != ProofStatement::Kyc(*claim_type) {
                return Err(RegistryError::KycVerificationFailed(format!(
                    "{claim_type} entry carries a {} proof",
                    proof.statement
                )));
            }
            if proof.subject() != Some(request.did.as_str()) {
                return Err(RegistryError::KycVerificationFailed(format!(
                    "{claim_type} proof is about another subject"
                )));
            }
            let valid = within(
                self.oracle_timeout,
                "oracle.verify_proof",
                self.oracle.verify_proof(proof),
            )
            .await??;
            if !valid {
                return Err(RegistryError::KycVerificationFailed(format!(
                    "{claim_type} proof does not verify"
                )));
            }
            digests.insert(claim_type.as_str(), proof.digest()?.to_hex());
        }
        Ok(sha256_digest(&CanonicalBytes::new(&digests)?))
    }

    async fn bind(
        &self,
        tx: &mut dyn Transaction,
        request: &RegistrationRequest,
        pseudonym: &Pseudonym,
        proof: Proof,
    ) -> Result<(RegistrationOutcome, SignerView, ContentDigest), RegistryError> {
        let did = &request.did;
        let record = self.dids.active_in(tx, did).await?;
        Self::check_unlinkable(&record.document, &request.signing_key)?;

        let by_pseudonym = self.get::<PseudonymBinding>(tx, pseudonym.as_str()).await?;
        if let Some(binding) = &by_pseudonym {
            if binding.did != *did {
                warn!(pseudonym = %pseudonym, "registration rejected: pseudonym collision");
                return Err(RegistryError::PseudonymCollision(pseudonym.to_string()));
            }
        }
        let by_did = self.get::<DidBinding>(tx, did.as_str()).await?;
        if let Some(binding) = &by_did {
            if binding.pseudonym != *pseudonym {
                warn!(did = %did, "registration rejected: DID bound to another pseudonym");
                return Err(RegistryError::DidAlreadyRegistered);
            }
        }
        let existing = self.get::<VerifiedSigner>(tx, did.as_str()).await?;
        let log = self
            .get::<SignerProofLog>(tx, pseudonym.as_str())
            .await?;

        let now = Timestamp::now();
        match (by_pseudonym, by_did, existing, log) {
            (None, None, None, None) => {
                let signer = VerifiedSigner {
                    did: did.clone(),
                    kyc_status: KycStatus::Verified,
                    kyc_level: request.kyc_level,
                    kyc_timestamp: now,
                    signing_key: request.signing_key,
                    pseudonym: pseudonym.clone(),
                    encrypted_details: request.encrypted_details.clone(),
                };
                self.put(tx, &signer).await?;
                self.put(
                    tx,
                    &PseudonymBinding {
                        pseudonym: pseudonym.clone(),
                        did: did.clone(),
                        bound_at: now,
                    },
                )
                .await?;
                self.put(
                    tx,
                    &DidBinding {
                        did: did.clone(),
                        pseudonym: pseudonym.clone(),
                        bound_at: now,
                    },
                )
                .await?;
                let mut log = SignerProofLog::new(pseudonym.clone());
                let proof_hash = Self::append(&mut log, ProofEvent::Registered, proof, now)?;
                self.put(tx, &log).await?;
                Ok((RegistrationOutcome::Created, SignerView::from(&signer), proof_hash))
            }
            (Some(_), Some(_), Some(mut signer), Some(mut log)) => {
                let unchanged = signer.is_verified()
                    && signer.kyc_level == request.kyc_level
                    && signer.signing_key == request.signing_key
                    && signer.encrypted_details == request.encrypted_details;
                if unchanged {
                    let proof_hash = log.entries.last().map(|e| e.proof_hash.clone()).ok_or_else(
                        || RegistryError::InvariantViolation("empty signer proof log".to_string()),
                    )?;
                    return Ok((RegistrationOutcome::Unchanged, SignerView::from(&signer), proof_hash));
                }

                signer.kyc_status = KycStatus::Verified;
                signer.kyc_level = request.kyc_level;
                signer.kyc_timestamp = now;
                signer.signing_key = request.signing_key;
                signer.encrypted_details = request.encrypted_details.clone();
                self.put(tx, &signer).await?;
                let proof_hash = Self::append(&mut log, ProofEvent::Reverified, proof, now)?;
                self.put(tx, &log).await?;
                Ok((RegistrationOutcome::Reverified, SignerView::from(&signer), proof_hash))
            }
            _ => {
                error!(pseudonym = %pseudonym, "signer records are partially present");
                Err(RegistryError::InvariantViolation(format!(
                    "incomplete registration state for {pseudonym}"
                )))
            }
        }
    }

    fn append(
        log: &mut SignerProofLog,
        event: ProofEvent,
        proof: Proof,
        now: Timestamp,
    ) -> Result<ContentDigest, RegistryError> {
        let proof_hash = proof.digest()?;
        log.entries.push(SignerProof {
            pseudonym: log.pseudonym.clone(),
            proof_hash: proof_hash.clone(),
            timestamp: now,
            event,
            zk_proof: proof,
        });
        Ok(proof_hash)
    }

    async fn signer_record_in(
        &self,
        tx: &mut dyn Transaction,
        pseudonym: &Pseudonym,
    ) -> Result<Option<VerifiedSigner>, RegistryError> {
        let Some(binding) = self.get::<PseudonymBinding>(tx, pseudonym.as_str()).await? else {
            return Ok(None);
        };
        let signer = self
            .get::<VerifiedSigner>(tx, binding.did.as_str())
            .await?
            .ok_or_else(|| Self::dangling(pseudonym))?;
        Ok(Some(signer))
    }

    async fn signer_committed(
        &self,
        pseudonym: &Pseudonym,
    ) -> Result<Option<SignerView>, RegistryError> {
        let storage = self.storage.as_ref();
        let Some(binding) = bounded(
            self.storage_timeout,
            "registry.get",
            load_committed::<PseudonymBinding>(storage, pseudonym.as_str()),
        )
        .await?
        else {
            return Ok(None);
        };
        let signer = bounded(
            self.storage_timeout,
            "registry.get",
            load_committed::<VerifiedSigner>(storage, binding.did.as_str()),
        )
        .await?
        .ok_or_else(|| Self::dangling(pseudonym))?;
        Ok(Some(SignerView::from(&signer)))
    }

    fn dangling(pseudonym: &Pseudonym) -> RegistryError {
        error!(pseudonym = %pseudonym, "pseudonym binding without signer record");
        RegistryError::InvariantViolation(format!("binding for {pseudonym} has no signer"))
    }

    async fn get<T: cosign_store::Record>(
        &self,
        tx: &mut dyn Transaction,
        id: &str,
    ) -> Result<Option<T>, RegistryError> {
        Ok(bounded(self.storage_timeout, "registry.get", load::<T>(tx, id)).await?)
    }

    async fn put<T: cosign_store::Record>(
        &self,
        tx: &mut dyn Transaction,
        record: &T,
    ) -> Result<(), RegistryError> {
        Ok(bounded(self.storage_timeout, "registry.save", save(tx, record)).await?)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, RegistryError> {
        Ok(bounded(self.storage_timeout, "registry.begin", self.storage.begin()).await?)
    }

    async fn abort(&self, tx: Box<dyn Transaction>) {
        if let Err(e) = bounded(self.storage_timeout, "registry.rollback", tx.rollback()).await {
            warn!(error = %e, "rollback failed; staged writes dropped with the transaction");
        }
    }
}
