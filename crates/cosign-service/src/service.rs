//! # Composition Point
//!
//! [`CosignService::open`] wires the components together from explicit
//! collaborators: a [`Storage`] backend and a [`ProofOracle`]. Nothing is
//! global. The registry's pseudonym index is rebuilt from storage before
//! the service is returned.
//!
//! The facade methods take the string forms a presentation layer receives
//! and parse them before any I/O, so malformed input always surfaces as
//! `InvalidFormat`.

use std::collections::BTreeMap;
use std::sync::Arc;

use cosign_core::{ContentDigest, Did, DocumentId, Pseudonym};
use cosign_crypto::{Address, KeyPair, PublicKey};
use cosign_did::{DidDocument, DidManager};
use cosign_document::{Document, DocumentCoSigner};
use cosign_registry::{Registration, RegistrationRequest, RegistryError, SignerRegistry};
use cosign_store::Storage;
use cosign_zkp::{ClaimType, DidControl, Proof, ProofOracle};
use tracing::info;

use crate::config::CosignConfig;
use crate::error::ServiceError;

/// The assembled co-signing stack.
pub struct CosignService {
    config: CosignConfig,
    dids: Arc<DidManager>,
    registry: Arc<SignerRegistry>,
    cosigner: Arc<DocumentCoSigner>,
}

impl std::fmt::Debug for CosignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosignService")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl CosignService {
    /// Build every component over `storage` and `oracle`.
    pub async fn open(
        config: CosignConfig,
        storage: Arc<dyn Storage>,
        oracle: Arc<dyn ProofOracle>,
    ) -> Result<Self, ServiceError> {
        let dids = Arc::new(
            DidManager::new(storage.clone(), config.did_method.clone())?
                .with_timeout(config.storage_timeout),
        );
        let registry = Arc::new(
            SignerRegistry::new(
                storage.clone(),
                dids.clone(),
                oracle.clone(),
                config.registry_salt.clone(),
            )
            .with_timeouts(config.storage_timeout, config.oracle_timeout),
        );
        let cosigner = Arc::new(
            DocumentCoSigner::new(storage, registry.clone(), oracle.clone())
                .with_timeouts(config.storage_timeout, config.oracle_timeout),
        );

        let signers = registry.rebuild_index().await?;
        info!(
            did_method = %config.did_method,
            oracle = oracle.name(),
            signers,
            "cosign service ready"
        );

        Ok(Self {
            config,
            dids,
            registry,
            cosigner,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CosignConfig {
        &self.config
    }

    /// The DID Manager.
    pub fn dids(&self) -> &Arc<DidManager> {
        &self.dids
    }

    /// The Signer Registry.
    pub fn registry(&self) -> &Arc<SignerRegistry> {
        &self.registry
    }

    /// The Document Co-Signer.
    pub fn cosigner(&self) -> &Arc<DocumentCoSigner> {
        &self.cosigner
    }

    /// Create a DID from an address and a hex public key.
    pub async fn create_did(&self, address: &str, public_key_hex: &str) -> Result<Did, ServiceError> {
        let address = Address::parse(address)?;
        let public_key = PublicKey::from_hex(public_key_hex)?;
        Ok(self.dids.create_did(&address, &public_key).await?)
    }

    /// Resolve a DID.
    pub async fn resolve_did(&self, id: &str) -> Result<DidDocument, ServiceError> {
        Ok(self.dids.resolve_did(id).await?)
    }

    /// A registration request at the configured default KYC level.
    /// `did_key` must be an authentication key of `did`; it signs for the
    /// fresh `signing_key` and is not kept.
    pub fn new_registration(
        &self,
        did: Did,
        did_key: &KeyPair,
        signing_key: PublicKey,
        identity_proofs: BTreeMap<ClaimType, Proof>,
        encrypted_details: impl Into<String>,
    ) -> Result<RegistrationRequest, ServiceError> {
        let did_control =
            DidControl::sign(&did, did_key, &signing_key).map_err(RegistryError::from)?;
        Ok(RegistrationRequest {
            did,
            signing_key,
            did_control,
            identity_proofs,
            encrypted_details: encrypted_details.into(),
            kyc_level: self.config.default_kyc_level,
        })
    }

    /// Register or re-register a signer.
    pub async fn register_signer(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, ServiceError> {
        Ok(self.registry.register_signer(request).await?)
    }

    /// Whether a pseudonym may currently sign.
    pub async fn is_signer_verified(&self, pseudonym: &str) -> Result<bool, ServiceError> {
        let pseudonym = Pseudonym::new(pseudonym)?;
        Ok(self.registry.is_signer_verified(&pseudonym).await?)
    }

    /// Create a draft document owned by `owner` over a hex SHA-256 content
    /// hash.
    pub async fn create_document(
        &self,
        owner: &str,
        content_hash_hex: &str,
    ) -> Result<DocumentId, ServiceError> {
        let owner = Did::new(owner)?;
        let content_hash = ContentDigest::from_hex(content_hash_hex)?;
        Ok(self.cosigner.create_document(owner, content_hash).await?)
    }

    /// Add a required signer to a document.
    pub async fn add_required_signer(
        &self,
        document_id: &str,
        pseudonym: &str,
    ) -> Result<Document, ServiceError> {
        let document_id = DocumentId::parse(document_id)?;
        let pseudonym = Pseudonym::new(pseudonym)?;
        Ok(self
            .cosigner
            .add_required_signer(&document_id, &pseudonym)
            .await?)
    }

    /// Sign a document with a 32-byte seed or 64-byte keypair.
    pub async fn sign_document(
        &self,
        document_id: &str,
        pseudonym: &str,
        private_key: &[u8],
    ) -> Result<ContentDigest, ServiceError> {
        let document_id = DocumentId::parse(document_id)?;
        let pseudonym = Pseudonym::new(pseudonym)?;
        let key = KeyPair::from_secret_bytes(private_key)?;
        Ok(self
            .cosigner
            .sign_document(&document_id, &pseudonym, &key)
            .await?)
    }

    /// Whether the stored signature has the given hex hash.
    pub async fn verify_signature(
        &self,
        document_id: &str,
        pseudonym: &str,
        signature_hash_hex: &str,
    ) -> Result<bool, ServiceError> {
        let document_id = DocumentId::parse(document_id)?;
        let pseudonym = Pseudonym::new(pseudonym)?;
        let signature_hash = ContentDigest::from_hex(signature_hash_hex)?;
        Ok(self
            .cosigner
            .verify_signature(&document_id, &pseudonym, &signature_hash)
            .await?)
    }
}
