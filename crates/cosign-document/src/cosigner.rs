//! # Document Co-Signer
//!
//! Lifecycle per document: `DRAFT -> PENDING -> SIGNED`.
//!
//! ## Signing
//!
//! Eligibility (verified signer, required signer, registered key) is checked
//! against committed state before any work. The signature and its oracle
//! proof are then produced outside the storage transaction. Inside one
//! transaction the co-signer re-checks eligibility, writes the signature,
//! appends to the attempt log, recomputes completion from the post-write
//! state and writes the status. Concurrent last signatures therefore cannot
//! both observe "incomplete".
//!
//! Signing a document that is already `SIGNED` returns the stored
//! signature hash without writing, so callers may retry freely.

use std::sync::Arc;
use std::time::Duration;

use cosign_core::deadline::within;
use cosign_core::{sha256_raw, CanonicalBytes, ContentDigest, Did, DocumentId, Pseudonym, Timestamp};
use cosign_crypto::{KeyPair, PublicKey};
use cosign_registry::SignerRegistry;
use cosign_store::{bounded, load, load_committed, save, Record, Storage, Transaction};
use cosign_zkp::{ProofOracle, ProofPayload, ProofStatement};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::error::DocumentError;
use crate::records::{
    AttemptLog, AttemptOutcome, Document, DocumentStatus, SignatureAttempt, SignatureData,
};

/// Default bound on each storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on each oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// The bytes a signer signs: canonical JSON of these fields.
#[derive(Debug, Clone, Serialize)]
pub struct SigningPayload<'a> {
    /// The document.
    pub document_id: &'a DocumentId,
    /// The signer.
    pub pseudonym: &'a Pseudonym,
    /// Document content hash.
    pub content_hash: &'a ContentDigest,
    /// Signing time.
    pub timestamp: &'a Timestamp,
}

impl SigningPayload<'_> {
    /// Canonical bytes to sign.
    pub fn canonical(&self) -> Result<CanonicalBytes, DocumentError> {
        Ok(CanonicalBytes::new(self)?)
    }
}

/// Outcome of an independent re-verification of a stored signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAudit {
    /// The document.
    pub document_id: DocumentId,
    /// The signer.
    pub pseudonym: Pseudonym,
    /// Stored hash equals SHA-256 of the stored signature.
    pub hash_matches: bool,
    /// The signature verifies under the signer's registered key.
    pub signature_valid: bool,
    /// The oracle proof verifies and names this document, signer and hash.
    /// `None` when no proof was stored.
    pub proof_valid: Option<bool>,
}

impl SignatureAudit {
    /// Whether every check passed.
    pub fn is_valid(&self) -> bool {
        self.hash_matches && self.signature_valid && self.proof_valid.unwrap_or(false)
    }
}

/// Tracks required signers and collects their signatures.
pub struct DocumentCoSigner {
    storage: Arc<dyn Storage>,
    registry: Arc<SignerRegistry>,
    oracle: Arc<dyn ProofOracle>,
    storage_timeout: Duration,
    oracle_timeout: Duration,
}

impl std::fmt::Debug for DocumentCoSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCoSigner")
            .field("oracle", &self.oracle.name())
            .field("storage_timeout", &self.storage_timeout)
            .field("oracle_timeout", &self.oracle_timeout)
            .finish_non_exhaustive()
    }
}

impl DocumentCoSigner {
    /// Build a co-signer over its collaborators.
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<SignerRegistry>,
        oracle: Arc<dyn ProofOracle>,
    ) -> Self {
        Self {
            storage,
            registry,
            oracle,
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

    /// Create a draft document.
    pub async fn create_document(
        &self,
        owner: Did,
        content_hash: ContentDigest,
    ) -> Result<DocumentId, DocumentError> {
        let now = Timestamp::now();
        let document = Document {
            id: DocumentId::new(),
            content_hash,
            owner,
            status: DocumentStatus::Draft,
            required_signers: Default::default(),
            created: now,
            updated: now,
            signed_at: None,
        };

        let mut tx = self.begin().await?;
        self.put(tx.as_mut(), &document).await?;
        self.put(
            tx.as_mut(),
            &AttemptLog {
                document_id: document.id,
                attempts: Vec::new(),
            },
        )
        .await?;
        bounded(self.storage_timeout, "document.commit", tx.commit()).await?;

        info!(document_id = %document.id, "document created");
        Ok(document.id)
    }

    /// Add a verified signer to the required set. The first addition moves
    /// the document from `DRAFT` to `PENDING`.
    pub async fn add_required_signer(
        &self,
        document_id: &DocumentId,
        pseudonym: &Pseudonym,
    ) -> Result<Document, DocumentError> {
        if !self.registry.is_signer_verified(pseudonym).await? {
            warn!(document_id = %document_id, pseudonym = %pseudonym, "required signer rejected: not verified");
            return Err(DocumentError::SignerNotVerified(pseudonym.to_string()));
        }

        let mut tx = self.begin().await?;
        let verified = match self.registry.signer_in(tx.as_mut(), pseudonym).await {
            Ok(signer) => signer.is_some_and(|s| s.is_verified()),
            Err(e) => {
                self.abort(tx).await;
                return Err(e.into());
            }
        };
        if !verified {
            self.abort(tx).await;
            warn!(document_id = %document_id, pseudonym = %pseudonym, "required signer rejected: not verified");
            return Err(DocumentError::SignerNotVerified(pseudonym.to_string()));
        }
        let mut document = match self.document_in(tx.as_mut(), document_id).await {
            Ok(document) => document,
            Err(e) => {
                self.abort(tx).await;
                return Err(e);
            }
        };
        if document.status == DocumentStatus::Signed {
            self.abort(tx).await;
            return Err(DocumentError::AlreadySigned(*document_id));
        }
        if document.requires(pseudonym) {
            self.abort(tx).await;
            debug!(document_id = %document_id, pseudonym = %pseudonym, "signer already required");
            return Ok(document);
        }

        document.required_signers.insert(pseudonym.clone());
        if document.status == DocumentStatus::Draft {
            document.status = DocumentStatus::Pending;
        }
        document.updated = Timestamp::now();
        self.put(tx.as_mut(), &document).await?;
        bounded(self.storage_timeout, "document.commit", tx.commit()).await?;

        info!(
            document_id = %document_id,
            pseudonym = %pseudonym,
            required = document.required_signers.len(),
            "required signer added"
        );
        Ok(document)
    }

    /// Sign a document as `pseudonym`. Returns the signature hash.
    pub async fn sign_document(
        &self,
        document_id: &DocumentId,
        pseudonym: &Pseudonym,
        key: &KeyPair,
    ) -> Result<ContentDigest, DocumentError> {
        if !self.registry.is_signer_verified(pseudonym).await? {
            warn!(document_id = %document_id, pseudonym = %pseudonym, "signature rejected: signer not verified");
            return Err(DocumentError::SignerNotVerified(pseudonym.to_string()));
        }
        let document = self.get_document(document_id).await?;
        if !document.requires(pseudonym) {
            warn!(document_id = %document_id, pseudonym = %pseudonym, "signature rejected: not a required signer");
            return Err(DocumentError::SignerNotAuthorized {
                document_id: *document_id,
                pseudonym: pseudonym.to_string(),
            });
        }
        if !self
            .registry
            .signer_key_matches(pseudonym, &key.public_key())
            .await?
        {
            warn!(document_id = %document_id, pseudonym = %pseudonym, "signature rejected: key mismatch");
            return Err(DocumentError::SignerKeyMismatch(pseudonym.to_string()));
        }
        if document.status == DocumentStatus::Signed {
            let stored = self.stored_signature(document_id, pseudonym).await?;
            debug!(document_id = %document_id, pseudonym = %pseudonym, "document already signed");
            return Ok(stored.signature_hash);
        }

        let timestamp = Timestamp::now();
        let message = SigningPayload {
            document_id,
            pseudonym,
            content_hash: &document.content_hash,
            timestamp: &timestamp,
        }
        .canonical()?;
        let signature = key.sign_canonical(&message);
        let signature_hash = sha256_raw(signature.as_bytes());

        let payload = ProofPayload::DocumentSignature {
            document_id: *document_id,
            pseudonym: pseudonym.clone(),
            content_hash: document.content_hash.clone(),
            signature_hash: signature_hash.clone(),
            message: message.as_bytes().to_vec(),
            signature,
            public_key: key.public_key(),
        };
        let proof = within(
            self.oracle_timeout,
            "oracle.generate_proof",
            self.oracle.generate_proof(&payload),
        )
        .await??
        .redacted();

        let record = SignatureData {
            document_id: *document_id,
            signer_pseudonym: pseudonym.clone(),
            timestamp,
            signature_hash,
            signature,
            zk_proof: Some(proof),
        };

        let mut tx = self.begin().await?;
        match self.record_signature(tx.as_mut(), &record, &key.public_key()).await {
            Ok(Recorded::Written { complete }) => {
                bounded(self.storage_timeout, "document.commit", tx.commit()).await?;
                info!(
                    document_id = %document_id,
                    pseudonym = %pseudonym,
                    complete,
                    "signature recorded"
                );
                Ok(record.signature_hash)
            }
            Ok(Recorded::AlreadySigned(hash)) => {
                self.abort(tx).await;
                debug!(document_id = %document_id, pseudonym = %pseudonym, "document signed concurrently");
                Ok(hash)
            }
            Err(e) => {
                self.abort(tx).await;
                Err(e)
            }
        }
    }

    /// Whether the stored signature of `pseudonym` on the document has this
    /// hash. A lookup only; see [`DocumentCoSigner::audit_signature`].
    pub async fn verify_signature(
        &self,
        document_id: &DocumentId,
        pseudonym: &Pseudonym,
        signature_hash: &ContentDigest,
    ) -> Result<bool, DocumentError> {
        let stored = bounded(
            self.storage_timeout,
            "document.get",
            load_committed::<SignatureData>(
                self.storage.as_ref(),
                &SignatureData::key(document_id, pseudonym),
            ),
        )
        .await?;
        Ok(stored.is_some_and(|s| {
            s.signature_hash.algorithm == signature_hash.algorithm
                && bool::from(s.signature_hash.bytes[..].ct_eq(&signature_hash.bytes[..]))
        }))
    }

    /// Re-verify a stored signature from scratch: hash, Ed25519 signature
    /// under the registered key, and the oracle proof.
    pub async fn audit_signature(
        &self,
        document_id: &DocumentId,
        pseudonym: &Pseudonym,
    ) -> Result<SignatureAudit, DocumentError> {
        let document = self.get_document(document_id).await?;
        let stored = self.stored_signature(document_id, pseudonym).await?;

        let hash_matches = sha256_raw(stored.signature.as_bytes()) == stored.signature_hash;
        let message = SigningPayload {
            document_id,
            pseudonym,
            content_hash: &document.content_hash,
            timestamp: &stored.timestamp,
        }
        .canonical()?;
        let signature_valid = self
            .registry
            .verify_signer_signature(pseudonym, &message, &stored.signature)
            .await?;

        let proof_valid = match &stored.zk_proof {
            Some(proof) => {
                let binds = proof.statement == ProofStatement::DocumentSignature
                    && proof.public_input("document_id").and_then(|v| v.as_str())
                        == Some(document_id.to_string().as_str())
                    && proof.public_input("pseudonym").and_then(|v| v.as_str())
                        == Some(pseudonym.as_str())
                    && proof.public_input("signature_hash").and_then(|v| v.as_str())
                        == Some(stored.signature_hash.to_hex().as_str());
                let verifies = within(
                    self.oracle_timeout,
                    "oracle.verify_proof",
                    self.oracle.verify_proof(proof),
                )
                .await??;
                Some(binds && verifies)
            }
            None => None,
        };

        let audit = SignatureAudit {
            document_id: *document_id,
            pseudonym: pseudonym.clone(),
            hash_matches,
            signature_valid,
            proof_valid,
        };
        if !audit.is_valid() {
            warn!(document_id = %document_id, pseudonym = %pseudonym, "signature audit failed");
        }
        Ok(audit)
    }

    /// Fetch a document.
    pub async fn get_document(&self, document_id: &DocumentId) -> Result<Document, DocumentError> {
        bounded(
            self.storage_timeout,
            "document.get",
            load_committed::<Document>(self.storage.as_ref(), &document_id.to_string()),
        )
        .await?
        .ok_or(DocumentError::DocumentNotFound(*document_id))
    }

    /// Signatures that count toward completion, ordered by pseudonym.
    pub async fn signatures(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<SignatureData>, DocumentError> {
        let document = self.get_document(document_id).await?;
        let mut out = Vec::with_capacity(document.required_signers.len());
        for pseudonym in &document.required_signers {
            let stored = bounded(
                self.storage_timeout,
                "document.get",
                load_committed::<SignatureData>(
                    self.storage.as_ref(),
                    &SignatureData::key(document_id, pseudonym),
                ),
            )
            .await?;
            out.extend(stored);
        }
        Ok(out)
    }

    /// Every accepted signing attempt on the document, oldest first.
    pub async fn signature_attempts(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<SignatureAttempt>, DocumentError> {
        let log = bounded(
            self.storage_timeout,
            "document.get",
            load_committed::<AttemptLog>(self.storage.as_ref(), &document_id.to_string()),
        )
        .await?
        .ok_or(DocumentError::DocumentNotFound(*document_id))?;
        Ok(log.attempts)
    }

    async fn record_signature(
        &self,
        tx: &mut dyn Transaction,
        record: &SignatureData,
        public_key: &PublicKey,
    ) -> Result<Recorded, DocumentError> {
        let document_id = &record.document_id;
        let pseudonym = &record.signer_pseudonym;

        let signer = self
            .registry
            .signer_in(tx, pseudonym)
            .await?
            .filter(|s| s.is_verified())
            .ok_or_else(|| DocumentError::SignerNotVerified(pseudonym.to_string()))?;
        if !signer.signing_key.ct_eq(public_key) {
            return Err(DocumentError::SignerKeyMismatch(pseudonym.to_string()));
        }

        let mut document = self.document_in(tx, document_id).await?;
        if !document.requires(pseudonym) {
            return Err(DocumentError::SignerNotAuthorized {
                document_id: *document_id,
                pseudonym: pseudonym.to_string(),
            });
        }

        let key = SignatureData::key(document_id, pseudonym);
        let previous = self.get::<SignatureData>(tx, &key).await?;
        if document.status == DocumentStatus::Signed {
            return match previous {
                Some(previous) => Ok(Recorded::AlreadySigned(previous.signature_hash)),
                None => Err(self.violation(document_id, "signed document lacks a required signature")),
            };
        }

        self.put(tx, record).await?;

        let mut log = self
            .get::<AttemptLog>(tx, &document_id.to_string())
            .await?
            .unwrap_or_else(|| AttemptLog {
                document_id: *document_id,
                attempts: Vec::new(),
            });
        log.attempts.push(SignatureAttempt {
            pseudonym: pseudonym.clone(),
            signature_hash: record.signature_hash.clone(),
            timestamp: record.timestamp,
            outcome: if previous.is_some() {
                AttemptOutcome::Resubmitted
            } else {
                AttemptOutcome::Recorded
            },
        });
        self.put(tx, &log).await?;

        let mut complete = true;
        for required in &document.required_signers {
            let present = required == pseudonym
                || self
                    .get::<SignatureData>(tx, &SignatureData::key(document_id, required))
                    .await?
                    .is_some();
            if !present {
                complete = false;
                break;
            }
        }

        let now = Timestamp::now();
        if complete {
            if !document.status.can_transition_to(DocumentStatus::Signed) {
                return Err(self.violation(document_id, "completed document is not pending"));
            }
            document.status = DocumentStatus::Signed;
            document.signed_at = Some(now);
        }
        document.updated = now;
        self.put(tx, &document).await?;

        Ok(Recorded::Written { complete })
    }

    async fn stored_signature(
        &self,
        document_id: &DocumentId,
        pseudonym: &Pseudonym,
    ) -> Result<SignatureData, DocumentError> {
        bounded(
            self.storage_timeout,
            "document.get",
            load_committed::<SignatureData>(
                self.storage.as_ref(),
                &SignatureData::key(document_id, pseudonym),
            ),
        )
        .await?
        .ok_or_else(|| DocumentError::SignatureNotFound {
            document_id: *document_id,
            pseudonym: pseudonym.to_string(),
        })
    }

    async fn document_in(
        &self,
        tx: &mut dyn Transaction,
        document_id: &DocumentId,
    ) -> Result<Document, DocumentError> {
        self.get::<Document>(tx, &document_id.to_string())
            .await?
            .ok_or(DocumentError::DocumentNotFound(*document_id))
    }

    fn violation(&self, document_id: &DocumentId, what: &str) -> DocumentError {
        error!(document_id = %document_id, "{what}");
        DocumentError::InvariantViolation(format!("{document_id}: {what}"))
    }

    async fn get<T: Record>(
        &self,
        tx: &mut dyn Transaction,
        id: &str,
    ) -> Result<Option<T>, DocumentError> {
        Ok(bounded(self.storage_timeout, "document.get", load::<T>(tx, id)).await?)
    }

    async fn put<T: Record>(&self, tx: &mut dyn Transaction, record: &T) -> Result<(), DocumentError> {
        Ok(bounded(self.storage_timeout, "document.save", save(tx, record)).await?)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, DocumentError> {
        Ok(bounded(self.storage_timeout, "document.begin", self.storage.begin()).await?)
    }

    async fn abort(&self, tx: Box<dyn Transaction>) {
        if let Err(e) = bounded(self.storage_timeout, "document.rollback", tx.rollback()).await {
            warn!(error = %e, "rollback failed; staged writes dropped with the transaction");
        }
    }
}

enum Recorded {
    Written { complete: bool },
    AlreadySigned(ContentDigest),
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use cosign_core::ErrorKind;
    use cosign_crypto::derive_address;
    use cosign_did::DidManager;
    use cosign_registry::{KycStatus, RegistrationRequest, RegistrySalt, SignerView};
    use cosign_store::MemoryStore;
    use cosign_zkp::{ClaimType, DidControl, IdentityClaim, KycClaim, KycLevel, MockProofOracle};

    struct Fixture {
        store: MemoryStore,
        dids: Arc<DidManager>,
        oracle: Arc<MockProofOracle>,
        registry: Arc<SignerRegistry>,
        cosigner: DocumentCoSigner,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let storage: Arc<dyn Storage> = Arc::new(store.clone());
        let dids = Arc::new(DidManager::new(storage.clone(), "midnight").unwrap());
        let oracle = Arc::new(MockProofOracle::new([5u8; 32]));
        let registry = Arc::new(SignerRegistry::new(
            storage.clone(),
            dids.clone(),
            oracle.clone(),
            RegistrySalt::new([6u8; 32]),
        ));
        let cosigner = DocumentCoSigner::new(storage, registry.clone(), oracle.clone());
        Fixture {
            store,
            dids,
            oracle,
            registry,
            cosigner,
        }
    }

    /// Registers a DID from `seed` and returns the pseudonym with its
    /// signing key, which is not the DID key.
    async fn signer(f: &Fixture, seed: u8) -> (Pseudonym, KeyPair) {
        let did_key = KeyPair::from_seed(&[seed; 32]);
        let pk = did_key.public_key();
        let kp = KeyPair::from_seed(&[seed.wrapping_add(128); 32]);
        let did = f.dids.create_did(&derive_address(&pk), &pk).await.unwrap();
        let identity = f
            .oracle
            .generate_proof(&ProofPayload::Claim {
                subject: did.clone(),
                claim: KycClaim::Identity(IdentityClaim::new("Signer", "ID0001", "FR").unwrap()),
            })
            .await
            .unwrap();
        let mut proofs = BTreeMap::new();
        proofs.insert(ClaimType::Identity, identity.redacted());
        let reg = f
            .registry
            .register_signer(RegistrationRequest {
                did_control: DidControl::sign(&did, &did_key, &kp.public_key()).unwrap(),
                did,
                signing_key: kp.public_key(),
                identity_proofs: proofs,
                encrypted_details: String::new(),
                kyc_level: KycLevel::Basic,
            })
            .await
            .unwrap();
        (reg.pseudonym, kp)
    }

    fn owner() -> Did {
        Did::new("did:midnight:owner").unwrap()
    }

    async fn document_with(f: &Fixture, signers: &[&Pseudonym]) -> DocumentId {
        let id = f
            .cosigner
            .create_document(owner(), sha256_raw(b"contract text"))
            .await
            .unwrap();
        for p in signers {
            f.cosigner.add_required_signer(&id, p).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn draft_becomes_pending_on_first_signer() {
        let f = fixture();
        let (p1, _) = signer(&f, 1).await;
        let id = document_with(&f, &[]).await;
        assert_eq!(f.cosigner.get_document(&id).await.unwrap().status, DocumentStatus::Draft);

        let doc = f.cosigner.add_required_signer(&id, &p1).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
        let again = f.cosigner.add_required_signer(&id, &p1).await.unwrap();
        assert_eq!(again.required_signers.len(), 1);
    }

    #[tokio::test]
    async fn unverified_signer_cannot_be_required() {
        let f = fixture();
        let id = document_with(&f, &[]).await;
        let err = f
            .cosigner
            .add_required_signer(&id, &Pseudonym::new("sig_nobody").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::SignerNotVerified(_)));
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn rejected_signer_cannot_be_required_despite_stale_cache() {
        let f = fixture();
        let (p1, _) = signer(&f, 1).await;
        let id = document_with(&f, &[]).await;
        let rejected = f.registry.set_kyc_status(&p1, KycStatus::Rejected).await.unwrap();

        let far_future = Timestamp::from_unix_millis(rejected.kyc_timestamp.unix_millis() + 60_000)
            .unwrap();
        f.registry.index().put(SignerView {
            kyc_status: KycStatus::Verified,
            kyc_timestamp: far_future,
            ..rejected
        });
        assert!(f.registry.is_signer_verified(&p1).await.unwrap());

        let err = f.cosigner.add_required_signer(&id, &p1).await.unwrap_err();
        assert!(matches!(err, DocumentError::SignerNotVerified(_)));
        let doc = f.cosigner.get_document(&id).await.unwrap();
        assert!(doc.required_signers.is_empty());
        assert_eq!(doc.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn signed_only_when_every_signer_signed() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let (p2, k2) = signer(&f, 2).await;
        let id = document_with(&f, &[&p1, &p2]).await;

        let h1 = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();
        assert_eq!(f.cosigner.get_document(&id).await.unwrap().status, DocumentStatus::Pending);
        assert!(f.cosigner.verify_signature(&id, &p1, &h1).await.unwrap());
        assert!(!f.cosigner.verify_signature(&id, &p2, &h1).await.unwrap());

        let h2 = f.cosigner.sign_document(&id, &p2, &k2).await.unwrap();
        let doc = f.cosigner.get_document(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Signed);
        assert!(doc.signed_at.is_some());
        assert!(f.cosigner.verify_signature(&id, &p2, &h2).await.unwrap());
        assert_eq!(f.cosigner.signatures(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unrelated_signer_rejected_without_change() {
        let f = fixture();
        let (p1, _) = signer(&f, 1).await;
        let (outsider, k_out) = signer(&f, 3).await;
        let id = document_with(&f, &[&p1]).await;

        let err = f.cosigner.sign_document(&id, &outsider, &k_out).await.unwrap_err();
        assert!(matches!(err, DocumentError::SignerNotAuthorized { .. }));
        assert_eq!(f.cosigner.get_document(&id).await.unwrap().status, DocumentStatus::Pending);
        assert!(f.cosigner.signatures(&id).await.unwrap().is_empty());
        assert_eq!(f.store.count("signatures"), 0);
    }

    #[tokio::test]
    async fn wrong_key_rejected() {
        let f = fixture();
        let (p1, _) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        let err = f
            .cosigner
            .sign_document(&id, &p1, &KeyPair::from_seed(&[99; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::SignerKeyMismatch(_)));
    }

    #[tokio::test]
    async fn rejected_signer_cannot_sign() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        f.registry.set_kyc_status(&p1, KycStatus::Rejected).await.unwrap();
        let err = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap_err();
        assert!(matches!(err, DocumentError::SignerNotVerified(_)));
    }

    #[tokio::test]
    async fn resubmission_replaces_and_logs() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let (p2, _) = signer(&f, 2).await;
        let id = document_with(&f, &[&p1, &p2]).await;

        let first = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();
        assert_ne!(first, second);
        assert!(f.cosigner.verify_signature(&id, &p1, &second).await.unwrap());
        assert!(!f.cosigner.verify_signature(&id, &p1, &first).await.unwrap());
        assert_eq!(f.cosigner.get_document(&id).await.unwrap().status, DocumentStatus::Pending);

        let attempts = f.cosigner.signature_attempts(&id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Recorded);
        assert_eq!(attempts[1].outcome, AttemptOutcome::Resubmitted);
    }

    #[tokio::test]
    async fn signing_a_signed_document_returns_stored_hash() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        let hash = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();
        let again = f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();
        assert_eq!(hash, again);
        assert_eq!(f.cosigner.signature_attempts(&id).await.unwrap().len(), 1);

        let (p2, _) = signer(&f, 2).await;
        let err = f.cosigner.add_required_signer(&id, &p2).await.unwrap_err();
        assert!(matches!(err, DocumentError::AlreadySigned(_)));
    }

    #[tokio::test]
    async fn audit_reverifies_signature_and_proof() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();

        let audit = f.cosigner.audit_signature(&id, &p1).await.unwrap();
        assert!(audit.hash_matches);
        assert!(audit.signature_valid);
        assert_eq!(audit.proof_valid, Some(true));
        assert!(audit.is_valid());
    }

    #[tokio::test]
    async fn stored_proof_does_not_reveal_key_or_did() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        f.cosigner.sign_document(&id, &p1, &k1).await.unwrap();

        let raw = f
            .store
            .get("signatures", &SignatureData::key(&id, &p1))
            .await
            .unwrap()
            .unwrap()
            .to_string();
        assert!(!raw.contains("did:midnight"));
        assert!(!raw.contains(&k1.public_key().to_hex()));
    }

    #[tokio::test]
    async fn did_key_cannot_sign_for_its_pseudonym() {
        let f = fixture();
        let (p1, _) = signer(&f, 1).await;
        let id = document_with(&f, &[&p1]).await;
        let err = f
            .cosigner
            .sign_document(&id, &p1, &KeyPair::from_seed(&[1; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::SignerKeyMismatch(_)));
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let f = fixture();
        let (p1, k1) = signer(&f, 1).await;
        let err = f
            .cosigner
            .sign_document(&DocumentId::new(), &p1, &k1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
