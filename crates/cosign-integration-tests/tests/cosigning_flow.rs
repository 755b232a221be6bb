//! End-to-end flows: DID creation, KYC registration, document co-signing
//! and verification, driven through the composed service.

mod common;

use cosign_core::{sha256_raw, Did, DocumentId, ErrorKind, Pseudonym};
use cosign_crypto::{derive_address, verify_canonical};
use cosign_did::DidRecord;
use cosign_document::{AttemptOutcome, DocumentError, DocumentStatus, SignatureData, SigningPayload};
use cosign_registry::{KycStatus, RegistrationOutcome, RegistryError};
use cosign_service::ServiceError;
use cosign_store::Storage;

use common::*;

// =========================================================================
// Registration
// =========================================================================

#[tokio::test]
async fn registered_signer_is_verified_and_unknown_is_not() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 1).await;

    let reg = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();

    assert_eq!(reg.outcome, RegistrationOutcome::Created);
    assert!(reg.pseudonym.as_str().starts_with(Pseudonym::PREFIX));
    assert!(!reg.pseudonym.as_str().contains(did.method_specific_id()));
    assert!(h.service.is_signer_verified(reg.pseudonym.as_str()).await.unwrap());
    assert!(!h.service.is_signer_verified("sig_999").await.unwrap());
}

#[tokio::test]
async fn registration_is_idempotent() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 1).await;

    let first = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();
    let second = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();

    assert_eq!(first.pseudonym, second.pseudonym);
    assert_eq!(second.outcome, RegistrationOutcome::Unchanged);
    assert_eq!(first.proof_hash, second.proof_hash);
    let log = h.service.registry().signer_proofs(&first.pseudonym).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(h.store.count("pseudonym_bindings"), 1);
    assert_eq!(h.store.count("did_bindings"), 1);
}

#[tokio::test]
async fn distinct_dids_get_distinct_pseudonyms() {
    let h = harness().await;
    let mut seen = Vec::new();
    for seed in 1..=5u8 {
        let (_, p, _) = signer(&h, seed).await;
        assert!(!seen.contains(&p), "duplicate pseudonym {p}");
        seen.push(p);
    }
    assert_eq!(h.store.count("verified_signers"), 5);
}

#[tokio::test]
async fn pseudonym_survives_restart() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 3).await;
    let first = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();

    let reopened = harness_with(
        h.store.clone(),
        cosign_zkp::MockProofOracle::new(ORACLE_SECRET),
        config(),
    )
    .await;
    assert_eq!(reopened.service.registry().index().len(), 1);
    assert!(reopened
        .service
        .is_signer_verified(first.pseudonym.as_str())
        .await
        .unwrap());

    let again = reopened
        .service
        .register_signer(request(&reopened, &did, &kp).await)
        .await
        .unwrap();
    assert_eq!(again.pseudonym, first.pseudonym);
}

// =========================================================================
// Co-signing
// =========================================================================

#[tokio::test]
async fn three_signers_complete_only_when_all_sign() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 10).await;
    let (_, p1, k1) = signer(&h, 11).await;
    let (_, p2, k2) = signer(&h, 12).await;
    let (_, p3, k3) = signer(&h, 13).await;

    let content = sha256_raw(b"master services agreement v3");
    let doc = h
        .service
        .create_document(owner.as_str(), &content.to_hex())
        .await
        .unwrap()
        .to_string();
    for p in [&p1, &p2, &p3] {
        h.service.add_required_signer(&doc, p.as_str()).await.unwrap();
    }

    let h1 = h.service.sign_document(&doc, p1.as_str(), &k1.seed()[..]).await.unwrap();
    let h2 = h.service.sign_document(&doc, p2.as_str(), &k2.seed()[..]).await.unwrap();
    let document = h.service.cosigner().get_document(&DocumentId::parse(&doc).unwrap()).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Pending);
    assert!(document.signed_at.is_none());

    let h3 = h.service.sign_document(&doc, p3.as_str(), &k3.seed()[..]).await.unwrap();
    let document = h.service.cosigner().get_document(&DocumentId::parse(&doc).unwrap()).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Signed);
    assert!(document.signed_at.is_some());

    for (p, hash) in [(&p1, &h1), (&p2, &h2), (&p3, &h3)] {
        assert!(h
            .service
            .verify_signature(&doc, p.as_str(), &hash.to_hex())
            .await
            .unwrap());
    }
    assert!(!h
        .service
        .verify_signature(&doc, p1.as_str(), &h2.to_hex())
        .await
        .unwrap());
}

#[tokio::test]
async fn unrelated_signer_is_rejected_without_side_effects() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 20).await;
    let (_, p1, _) = signer(&h, 21).await;
    let (_, outsider, outsider_key) = signer(&h, 22).await;

    let doc_id = h
        .service
        .cosigner()
        .create_document(owner, sha256_raw(b"lease"))
        .await
        .unwrap();
    h.service.cosigner().add_required_signer(&doc_id, &p1).await.unwrap();

    let err = h
        .service
        .cosigner()
        .sign_document(&doc_id, &outsider, &outsider_key)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::SignerNotAuthorized { .. }));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let document = h.service.cosigner().get_document(&doc_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Pending);
    assert!(h.service.cosigner().signatures(&doc_id).await.unwrap().is_empty());
    assert_eq!(h.store.count("signatures"), 0);
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 30).await;
    let (_, p1, _) = signer(&h, 31).await;
    let (_, _, other_key) = signer(&h, 32).await;

    let doc_id = h
        .service
        .cosigner()
        .create_document(owner, sha256_raw(b"nda"))
        .await
        .unwrap();
    h.service.cosigner().add_required_signer(&doc_id, &p1).await.unwrap();

    let err = h
        .service
        .cosigner()
        .sign_document(&doc_id, &p1, &other_key)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::SignerKeyMismatch(_)));
    assert_eq!(h.store.count("signatures"), 0);
}

#[tokio::test]
async fn resubmission_is_recorded_and_signed_document_is_stable() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 40).await;
    let (_, p1, k1) = signer(&h, 41).await;
    let (_, p2, k2) = signer(&h, 42).await;
    let cosigner = h.service.cosigner();

    let doc_id = cosigner.create_document(owner, sha256_raw(b"deed")).await.unwrap();
    cosigner.add_required_signer(&doc_id, &p1).await.unwrap();
    cosigner.add_required_signer(&doc_id, &p2).await.unwrap();

    cosigner.sign_document(&doc_id, &p1, &k1).await.unwrap();
    let again = cosigner.sign_document(&doc_id, &p1, &k1).await.unwrap();
    assert!(cosigner.verify_signature(&doc_id, &p1, &again).await.unwrap());
    assert_eq!(cosigner.signatures(&doc_id).await.unwrap().len(), 1);
    assert_eq!(
        cosigner.get_document(&doc_id).await.unwrap().status,
        DocumentStatus::Pending
    );

    let last = cosigner.sign_document(&doc_id, &p2, &k2).await.unwrap();
    let replay = cosigner.sign_document(&doc_id, &p2, &k2).await.unwrap();
    assert_eq!(last, replay);

    let outcomes: Vec<_> = cosigner
        .signature_attempts(&doc_id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Recorded,
            AttemptOutcome::Resubmitted,
            AttemptOutcome::Recorded
        ]
    );
}

#[tokio::test]
async fn audit_reverifies_stored_signatures() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 50).await;
    let (_, p1, k1) = signer(&h, 51).await;
    let cosigner = h.service.cosigner();

    let doc_id = cosigner.create_document(owner, sha256_raw(b"will")).await.unwrap();
    cosigner.add_required_signer(&doc_id, &p1).await.unwrap();
    cosigner.sign_document(&doc_id, &p1, &k1).await.unwrap();

    let audit = cosigner.audit_signature(&doc_id, &p1).await.unwrap();
    assert!(audit.hash_matches);
    assert!(audit.signature_valid);
    assert_eq!(audit.proof_valid, Some(true));
    assert!(audit.is_valid());
}

#[tokio::test]
async fn revoked_kyc_blocks_signing() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 60).await;
    let (_, p1, k1) = signer(&h, 61).await;
    let cosigner = h.service.cosigner();

    let doc_id = cosigner.create_document(owner, sha256_raw(b"loan")).await.unwrap();
    cosigner.add_required_signer(&doc_id, &p1).await.unwrap();

    h.service
        .registry()
        .set_kyc_status(&p1, KycStatus::Rejected)
        .await
        .unwrap();
    assert!(!h.service.is_signer_verified(p1.as_str()).await.unwrap());

    let err = cosigner.sign_document(&doc_id, &p1, &k1).await.unwrap_err();
    assert!(matches!(err, DocumentError::SignerNotVerified(_)));
    assert_eq!(h.store.count("signatures"), 0);
}

// =========================================================================
// Privacy
// =========================================================================

#[tokio::test]
async fn document_records_carry_no_dids_of_signers() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 70).await;
    let (d1, p1, k1) = signer(&h, 71).await;
    let cosigner = h.service.cosigner();

    let doc_id = cosigner.create_document(owner, sha256_raw(b"memo")).await.unwrap();
    cosigner.add_required_signer(&doc_id, &p1).await.unwrap();
    cosigner.sign_document(&doc_id, &p1, &k1).await.unwrap();

    for collection in ["documents", "signatures", "signature_attempts"] {
        for record in h.store.list(collection).await.unwrap() {
            let text = record.to_string();
            assert!(!text.contains(d1.as_str()), "{collection} leaks the signer DID");
            assert!(!text.contains(&cosign_core::hex::encode(&k1.seed()[..])), "{collection} leaks key material");
        }
    }
}

#[tokio::test]
async fn stored_signatures_verify_under_no_did_document_key() {
    let h = harness().await;
    let (owner, _, _) = signer(&h, 90).await;
    let mut signers = Vec::new();
    for seed in 91..=95u8 {
        let (_, p, k) = signer(&h, seed).await;
        signers.push((p, k));
    }
    let cosigner = h.service.cosigner();
    let doc_id = cosigner.create_document(owner, sha256_raw(b"joint venture")).await.unwrap();
    for (p, _) in &signers {
        cosigner.add_required_signer(&doc_id, p).await.unwrap();
    }
    for (p, k) in &signers {
        cosigner.sign_document(&doc_id, p, k).await.unwrap();
    }
    let document = cosigner.get_document(&doc_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Signed);

    let did_records: Vec<DidRecord> = h
        .store
        .list("dids")
        .await
        .unwrap()
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();
    let did_keys: Vec<_> = did_records
        .iter()
        .flat_map(|r| r.document.verification_method.iter().map(|m| m.public_key_hex))
        .collect();
    assert_eq!(did_keys.len(), 6);

    let stored = h.store.list("signatures").await.unwrap();
    assert_eq!(stored.len(), signers.len());
    for value in stored {
        let sig: SignatureData = serde_json::from_value(value).unwrap();
        let message = SigningPayload {
            document_id: &sig.document_id,
            pseudonym: &sig.signer_pseudonym,
            content_hash: &document.content_hash,
            timestamp: &sig.timestamp,
        }
        .canonical()
        .unwrap();
        for key in &did_keys {
            assert!(
                !verify_canonical(&message, &sig.signature, key).unwrap(),
                "{} verifies under a DID key",
                sig.signer_pseudonym
            );
        }
        assert!(h
            .service
            .registry()
            .verify_signer_signature(&sig.signer_pseudonym, &message, &sig.signature)
            .await
            .unwrap());
    }

    for (p, k) in &signers {
        let derived = Did::from_parts("midnight", derive_address(&k.public_key()).as_str()).unwrap();
        assert!(did_records.iter().all(|r| r.document.id != derived));
        for proof in h.service.registry().signer_proofs(p).await.unwrap() {
            let public = proof.zk_proof.public_inputs.to_string();
            for record in &did_records {
                assert!(!public.contains(record.document.id.as_str()));
            }
            for key in &did_keys {
                assert!(!public.contains(&key.to_hex()));
            }
        }
    }
}

#[tokio::test]
async fn registry_errors_keep_their_kind_through_the_service() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 80).await;
    let mut req = request(&h, &did, &kp).await;
    req.identity_proofs.remove(&cosign_zkp::ClaimType::Email);

    let err = h.service.register_signer(req).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Registry(RegistryError::KycVerificationFailed(_))
    ));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!err.is_retryable());
}
