//! # DID Documents
//!
//! W3C-shaped documents for self-controlled DIDs. Field names serialize in
//! camelCase as in DID Core.
//!
//! ## Invariants
//!
//! - `id == controller`.
//! - Verification method ids are unique and are fragments of `id`.
//! - Every `authentication` and `assertionMethod` entry names a verification
//!   method present in the same document.
//! - At least one authentication method exists.

use std::collections::BTreeSet;

use cosign_core::{Did, Timestamp};
use cosign_crypto::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::DidError;

/// DID Core context URL.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type for Ed25519 keys.
pub const ED25519_METHOD_TYPE: &str = "Ed25519VerificationKey2020";

/// Fragment of the key a DID is created with.
pub const PRIMARY_KEY_FRAGMENT: &str = "key-1";

/// A public key usable to verify the DID subject's signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL, `<did>#<fragment>`.
    pub id: String,
    /// Key type.
    #[serde(rename = "type")]
    pub method_type: String,
    /// DID that controls this key.
    pub controller: Did,
    /// The key itself.
    pub public_key_hex: PublicKey,
}

impl VerificationMethod {
    /// Ed25519 verification method `<did>#<fragment>`.
    pub fn ed25519(did: &Did, fragment: &str, public_key: PublicKey) -> Self {
        Self {
            id: did.with_fragment(fragment),
            method_type: ED25519_METHOD_TYPE.to_string(),
            controller: did.clone(),
            public_key_hex: public_key,
        }
    }
}

/// A service endpoint advertised by the DID subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// DID URL, `<did>#<fragment>`.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint URL.
    pub service_endpoint: String,
}

/// A DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The DID.
    pub id: Did,
    /// The controlling DID. Equal to `id` for self-controlled DIDs.
    pub controller: Did,
    /// Keys.
    pub verification_method: Vec<VerificationMethod>,
    /// Ids of methods that may authenticate as the subject.
    pub authentication: Vec<String>,
    /// Ids of methods that may issue assertions.
    pub assertion_method: Vec<String>,
    /// Service endpoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
    /// Creation time.
    pub created: Timestamp,
    /// Last update time.
    pub updated: Timestamp,
}

impl DidDocument {
    /// A self-controlled document with one Ed25519 key used for both
    /// authentication and assertions.
    pub fn self_controlled(did: Did, public_key: PublicKey, now: Timestamp) -> Self {
        let method = VerificationMethod::ed25519(&did, PRIMARY_KEY_FRAGMENT, public_key);
        let method_id = method.id.clone();
        Self {
            context: vec![DID_CONTEXT.to_string()],
            controller: did.clone(),
            id: did,
            verification_method: vec![method],
            authentication: vec![method_id.clone()],
            assertion_method: vec![method_id],
            service: Vec::new(),
            created: now,
            updated: now,
        }
    }

    /// Look up a verification method by id.
    pub fn method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|m| m.id == id)
    }

    /// Authentication methods with their keys.
    pub fn authentication_methods(&self) -> impl Iterator<Item = &VerificationMethod> {
        self.authentication.iter().filter_map(|id| self.method(id))
    }

    /// The authentication method holding `key`, if any.
    pub fn authentication_method_for(&self, key: &PublicKey) -> Option<&VerificationMethod> {
        self.authentication_methods()
            .find(|m| m.public_key_hex.ct_eq(key))
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), DidError> {
        if self.id != self.controller {
            return Err(DidError::InvalidDocument(format!(
                "controller {} differs from id {}",
                self.controller, self.id
            )));
        }

        let prefix = format!("{}#", self.id);
        let mut ids = BTreeSet::new();
        for method in &self.verification_method {
            if !method.id.starts_with(&prefix) || method.id.len() == prefix.len() {
                return Err(DidError::InvalidDocument(format!(
                    "verification method {} is not a fragment of {}",
                    method.id, self.id
                )));
            }
            if method.controller != self.id {
                return Err(DidError::InvalidDocument(format!(
                    "verification method {} has foreign controller",
                    method.id
                )));
            }
            if !ids.insert(method.id.as_str()) {
                return Err(DidError::InvalidDocument(format!(
                    "duplicate verification method {}",
                    method.id
                )));
            }
        }

        for reference in self.authentication.iter().chain(&self.assertion_method) {
            if !ids.contains(reference.as_str()) {
                return Err(DidError::InvalidDocument(format!(
                    "{reference} does not name a verification method"
                )));
            }
        }

        if self.authentication.is_empty() {
            return Err(DidError::InvalidDocument(
                "document has no authentication method".to_string(),
            ));
        }

        let mut service_ids = BTreeSet::new();
        for service in &self.service {
            if !service.id.starts_with(&prefix) || !service_ids.insert(service.id.as_str()) {
                return Err(DidError::InvalidDocument(format!(
                    "service id {} is duplicated or not a fragment of {}",
                    service.id, self.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_crypto::KeyPair;

    fn doc() -> DidDocument {
        let did = Did::new("did:midnight:abc").unwrap();
        let pk = KeyPair::from_seed(&[1u8; 32]).public_key();
        DidDocument::self_controlled(did, pk, Timestamp::now())
    }

    #[test]
    fn self_controlled_document_is_valid() {
        let d = doc();
        d.validate().unwrap();
        assert_eq!(d.authentication, vec!["did:midnight:abc#key-1".to_string()]);
        assert_eq!(d.assertion_method, d.authentication);
        assert_eq!(d.id, d.controller);
    }

    #[test]
    fn serializes_w3c_field_names() {
        let json = serde_json::to_value(doc()).unwrap();
        assert_eq!(json["@context"][0], DID_CONTEXT);
        assert!(json["verificationMethod"].is_array());
        assert!(json["assertionMethod"].is_array());
        assert_eq!(json["verificationMethod"][0]["type"], ED25519_METHOD_TYPE);
        assert!(json["verificationMethod"][0]["publicKeyHex"].is_string());
        assert!(json.get("service").is_none());
    }

    #[test]
    fn dangling_reference_rejected() {
        let mut d = doc();
        d.assertion_method.push("did:midnight:abc#key-9".to_string());
        assert!(matches!(d.validate(), Err(DidError::InvalidDocument(_))));
    }

    #[test]
    fn controller_must_equal_id() {
        let mut d = doc();
        d.controller = Did::new("did:midnight:other").unwrap();
        assert!(d.validate().is_err());
    }

    #[test]
    fn empty_authentication_rejected() {
        let mut d = doc();
        d.authentication.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn finds_authentication_method_by_key() {
        let d = doc();
        let pk = KeyPair::from_seed(&[1u8; 32]).public_key();
        assert!(d.authentication_method_for(&pk).is_some());
        let other = KeyPair::from_seed(&[2u8; 32]).public_key();
        assert!(d.authentication_method_for(&other).is_none());
    }
}
