//! # Proofs
//!
//! A [`Proof`] is what the oracle hands back: the statement it attests to,
//! opaque proof bytes, the public inputs a verifier sees, and the private
//! inputs (witness) that were used to build it.
//!
//! ## Security Invariant
//!
//! Private inputs are never serialized and never printed by `Debug`. A proof
//! that has been stored or transmitted carries only its public half.

use cosign_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::ClaimType;

/// What a proof attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatement {
    /// A KYC claim of the given type holds for the subject.
    Kyc(ClaimType),
    /// A pseudonym was issued to some KYC-verified subject.
    SignerBinding,
    /// A pseudonym's key produced a valid signature over a document.
    DocumentSignature,
}

impl std::fmt::Display for ProofStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kyc(t) => write!(f, "kyc.{t}"),
            Self::SignerBinding => f.write_str("signer.binding"),
            Self::DocumentSignature => f.write_str("document.signature"),
        }
    }
}

/// An oracle-produced proof.
#[derive(Clone, Serialize, Deserialize)]
pub struct Proof {
    /// The statement proven.
    pub statement: ProofStatement,
    /// Opaque proof bytes.
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    /// Binding to the private inputs that does not reveal them.
    #[serde(with = "hex_bytes")]
    pub commitment: Vec<u8>,
    /// Inputs a verifier sees.
    pub public_inputs: Value,
    /// Witness. Present only on freshly generated proofs.
    #[serde(skip)]
    pub private_inputs: Option<Value>,
}

impl Proof {
    /// Look up a public input by name.
    pub fn public_input(&self, key: &str) -> Option<&Value> {
        self.public_inputs.get(key)
    }

    /// The `subject` public input, when the statement carries one.
    pub fn subject(&self) -> Option<&str> {
        self.public_input("subject").and_then(Value::as_str)
    }

    /// Drop the witness, leaving only what may be stored or sent.
    pub fn redacted(&self) -> Self {
        Self {
            private_inputs: None,
            ..self.clone()
        }
    }

    /// Content digest of the public half of the proof. Stable across
    /// serialization, so audit trails can reference it.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(&self.redacted())?))
    }
}

impl PartialEq for Proof {
    fn eq(&self, other: &Self) -> bool {
        self.statement == other.statement
            && self.proof == other.proof
            && self.commitment == other.commitment
            && self.public_inputs == other.public_inputs
    }
}

impl Eq for Proof {}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proof")
            .field("statement", &self.statement)
            .field("proof", &cosign_core::hex::encode(&self.proof))
            .field("public_inputs", &self.public_inputs)
            .field(
                "private_inputs",
                &self.private_inputs.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&cosign_core::hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        cosign_core::hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Proof {
        Proof {
            statement: ProofStatement::Kyc(ClaimType::Email),
            proof: vec![0xaa; 32],
            commitment: vec![0xbb; 32],
            public_inputs: json!({"subject": "did:midnight:abc"}),
            private_inputs: Some(json!({"address": "ada@example.org"})),
        }
    }

    #[test]
    fn private_inputs_are_not_serialized() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("ada@example.org"));
        assert!(!json.contains("private_inputs"));
        let back: Proof = serde_json::from_str(&json).unwrap();
        assert!(back.private_inputs.is_none());
        assert_eq!(back, sample());
    }

    #[test]
    fn debug_redacts_witness() {
        let dbg = format!("{:?}", sample());
        assert!(!dbg.contains("ada@example.org"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn digest_ignores_witness() {
        let a = sample();
        let b = a.redacted();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn statement_serde_and_display() {
        let s = ProofStatement::Kyc(ClaimType::Identity);
        assert_eq!(serde_json::to_value(s).unwrap(), json!({"kyc": "identity"}));
        assert_eq!(s.to_string(), "kyc.identity");
        assert_eq!(
            serde_json::to_value(ProofStatement::SignerBinding).unwrap(),
            json!("signer_binding")
        );
    }

    #[test]
    fn subject_accessor() {
        assert_eq!(sample().subject(), Some("did:midnight:abc"));
    }
}
