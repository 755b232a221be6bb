//! DID lifecycle across the DID Manager and the Signer Registry.

mod common;

use cosign_core::ErrorKind;
use cosign_crypto::{derive_address, KeyPair};
use cosign_did::{DidError, DidPatch, DidStatus, NewVerificationMethod, Service};
use cosign_registry::{RegistrationOutcome, RegistryError};
use cosign_service::ServiceError;
use proptest::prelude::*;

use common::*;

#[tokio::test]
async fn create_resolve_update_revoke() {
    let h = harness().await;
    let dids = h.service.dids();
    let kp = KeyPair::from_seed(&[1; 32]);
    let pk = kp.public_key();

    let did = h
        .service
        .create_did(derive_address(&pk).as_str(), &pk.to_hex())
        .await
        .unwrap();
    assert_eq!(did.method(), "midnight");
    let doc = h.service.resolve_did(did.as_str()).await.unwrap();
    assert!(doc.authentication_method_for(&pk).is_some());

    let dup = h
        .service
        .create_did(derive_address(&pk).as_str(), &pk.to_hex())
        .await
        .unwrap_err();
    assert!(matches!(dup, ServiceError::Did(DidError::AlreadyExists(_))));
    assert_eq!(dup.kind(), ErrorKind::Conflict);

    let second = KeyPair::from_seed(&[2; 32]).public_key();
    let patch = DidPatch::new(1)
        .add_service(Service {
            id: format!("{did}#inbox"),
            service_type: "MessagingService".to_string(),
            service_endpoint: "https://inbox.example.org".to_string(),
        })
        .add_verification_method(NewVerificationMethod {
            fragment: "key-2".to_string(),
            public_key: second,
            authentication: true,
            assertion: false,
        })
        .sign(&did, &kp)
        .unwrap();
    let updated = dids.update_did(did.as_str(), &patch).await.unwrap();
    assert_eq!(updated.service.len(), 1);
    assert!(updated.authentication_method_for(&second).is_some());

    let stale = dids.update_did(did.as_str(), &patch).await.unwrap_err();
    assert_eq!(stale.kind(), ErrorKind::Conflict);

    dids.revoke_did(did.as_str()).await.unwrap();
    dids.revoke_did(did.as_str()).await.unwrap();
    assert_eq!(dids.did_status(did.as_str()).await.unwrap(), DidStatus::Revoked);
}

#[tokio::test]
async fn address_must_derive_from_key() {
    let h = harness().await;
    let pk = KeyPair::from_seed(&[3; 32]).public_key();
    let other = KeyPair::from_seed(&[4; 32]).public_key();

    let err = h
        .service
        .create_did(derive_address(&other).as_str(), &pk.to_hex())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Did(DidError::AddressMismatch { .. })));
}

#[tokio::test]
async fn revoked_did_cannot_register() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 5).await;
    h.service.dids().revoke_did(did.as_str()).await.unwrap();

    let err = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Registry(RegistryError::Did(DidError::Revoked(_)))
    ));
    assert_eq!(h.store.count("verified_signers"), 0);
}

#[tokio::test]
async fn added_key_can_reregister_the_signer() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 6).await;
    let first = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();

    let rotated = KeyPair::from_seed(&[7; 32]);
    let patch = DidPatch::new(1)
        .add_verification_method(NewVerificationMethod {
            fragment: "key-2".to_string(),
            public_key: rotated.public_key(),
            authentication: true,
            assertion: true,
        })
        .sign(&did, &kp)
        .unwrap();
    h.service.dids().update_did(did.as_str(), &patch).await.unwrap();

    let again = h
        .service
        .register_signer(request(&h, &did, &rotated).await)
        .await
        .unwrap();
    assert_eq!(again.pseudonym, first.pseudonym);
    assert_eq!(again.outcome, RegistrationOutcome::Reverified);
    assert!(h
        .service
        .registry()
        .signer_key_matches(&again.pseudonym, &signing_key_for(&rotated).public_key())
        .await
        .unwrap());
    assert_eq!(
        h.service.registry().signer_proofs(&again.pseudonym).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn key_outside_the_document_is_refused() {
    let h = harness().await;
    let (did, _) = new_did(&h, 8).await;
    let stranger = KeyPair::from_seed(&[9; 32]);

    let err = h
        .service
        .register_signer(request(&h, &did, &stranger).await)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Registry(RegistryError::KeyNotInDidDocument)
    ));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn signing_key_published_in_the_did_document_is_refused() {
    let h = harness().await;
    let (did, kp) = new_did(&h, 10).await;
    let first = h
        .service
        .register_signer(request(&h, &did, &kp).await)
        .await
        .unwrap();

    let signing = signing_key_for(&kp).public_key();
    let patch = DidPatch::new(1)
        .add_verification_method(NewVerificationMethod {
            fragment: "key-2".to_string(),
            public_key: signing,
            authentication: false,
            assertion: true,
        })
        .sign(&did, &kp)
        .unwrap();
    h.service.dids().update_did(did.as_str(), &patch).await.unwrap();

    let mut req = request(&h, &did, &kp).await;
    req.encrypted_details = "enc:v2".to_string();
    let err = h.service.register_signer(req).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Registry(RegistryError::SigningKeyLinkable)
    ));
    assert_eq!(
        h.service.registry().signer_proofs(&first.pseudonym).await.unwrap().len(),
        1
    );
}

proptest! {
    #[test]
    fn malformed_dids_fail_before_io(s in "[a-zA-Z0-9:]{0,24}") {
        prop_assume!(cosign_core::Did::new(s.clone()).is_err());
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let h = harness().await;
            h.store.set_available(false);
            let err = h.service.resolve_did(&s).await.unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::InvalidFormat);
            Ok(())
        })?;
    }
}
