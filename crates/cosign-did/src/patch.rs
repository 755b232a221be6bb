//! Signed updates to a DID document.
//!
//! A patch is signed by one of the document's authentication keys over the
//! canonical bytes of `{did, patch, signer}`. `base_version` pins the patch
//! to the document version it was written against.

use cosign_core::{CanonicalBytes, Did};
use cosign_crypto::{KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::document::{DidDocument, Service, VerificationMethod};
use crate::error::DidError;

/// A key to add to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVerificationMethod {
    /// Fragment, e.g. `key-2`.
    pub fragment: String,
    /// The key.
    pub public_key: PublicKey,
    /// Also list it under `authentication`.
    #[serde(default)]
    pub authentication: bool,
    /// Also list it under `assertionMethod`.
    #[serde(default)]
    pub assertion: bool,
}

/// Changes to apply to a DID document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidPatch {
    /// Document version the patch was written against.
    pub base_version: u64,
    /// Services to add or replace (matched by id).
    #[serde(default)]
    pub add_services: Vec<Service>,
    /// Service ids to remove.
    #[serde(default)]
    pub remove_services: Vec<String>,
    /// Keys to add.
    #[serde(default)]
    pub add_verification_methods: Vec<NewVerificationMethod>,
    /// Verification method ids to remove, along with their references.
    #[serde(default)]
    pub remove_verification_methods: Vec<String>,
}

#[derive(Serialize)]
struct PatchPayload<'a> {
    did: &'a Did,
    patch: &'a DidPatch,
    signer: &'a PublicKey,
}

/// A patch with the controller's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDidPatch {
    /// DID being patched.
    pub did: Did,
    /// The changes.
    pub patch: DidPatch,
    /// Key that signed.
    pub signer: PublicKey,
    /// Signature over canonical `{did, patch, signer}`.
    pub signature: Signature,
}

impl DidPatch {
    /// Patch against `base_version` with no changes yet.
    pub fn new(base_version: u64) -> Self {
        Self {
            base_version,
            ..Self::default()
        }
    }

    /// Add or replace a service.
    pub fn add_service(mut self, service: Service) -> Self {
        self.add_services.push(service);
        self
    }

    /// Remove a service by id.
    pub fn remove_service(mut self, id: impl Into<String>) -> Self {
        self.remove_services.push(id.into());
        self
    }

    /// Add a key.
    pub fn add_verification_method(mut self, method: NewVerificationMethod) -> Self {
        self.add_verification_methods.push(method);
        self
    }

    /// Remove a key and every reference to it.
    pub fn remove_verification_method(mut self, id: impl Into<String>) -> Self {
        self.remove_verification_methods.push(id.into());
        self
    }

    /// Sign with a controller key.
    pub fn sign(self, did: &Did, key: &KeyPair) -> Result<SignedDidPatch, DidError> {
        let signer = key.public_key();
        let bytes = CanonicalBytes::new(&PatchPayload {
            did,
            patch: &self,
            signer: &signer,
        })?;
        Ok(SignedDidPatch {
            did: did.clone(),
            signature: key.sign_canonical(&bytes),
            patch: self,
            signer,
        })
    }

    /// Apply to a copy of `doc`. Does not bump version or timestamps.
    pub(crate) fn apply(&self, doc: &DidDocument) -> Result<DidDocument, DidError> {
        let mut next = doc.clone();

        for id in &self.remove_verification_methods {
            if next.method(id).is_none() {
                return Err(DidError::InvalidPatch(format!(
                    "verification method {id} does not exist"
                )));
            }
            next.verification_method.retain(|m| &m.id != id);
            next.authentication.retain(|r| r != id);
            next.assertion_method.retain(|r| r != id);
        }

        for added in &self.add_verification_methods {
            let method = VerificationMethod::ed25519(&next.id, &added.fragment, added.public_key);
            if next.method(&method.id).is_some() {
                return Err(DidError::InvalidPatch(format!(
                    "verification method {} already exists",
                    method.id
                )));
            }
            if added.authentication {
                next.authentication.push(method.id.clone());
            }
            if added.assertion {
                next.assertion_method.push(method.id.clone());
            }
            next.verification_method.push(method);
        }

        for id in &self.remove_services {
            next.service.retain(|s| &s.id != id);
        }
        for service in &self.add_services {
            next.service.retain(|s| s.id != service.id);
            next.service.push(service.clone());
        }

        Ok(next)
    }
}

impl SignedDidPatch {
    /// Check the signature. Says nothing about whether the signer controls
    /// the document.
    pub fn verify_signature(&self) -> Result<bool, DidError> {
        let bytes = CanonicalBytes::new(&PatchPayload {
            did: &self.did,
            patch: &self.patch,
            signer: &self.signer,
        })?;
        Ok(cosign_crypto::verify_canonical(&bytes, &self.signature, &self.signer)?)
    }
}
