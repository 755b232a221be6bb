//! # Proof Payloads
//!
//! The closed set of things the core asks the oracle to prove. Each variant
//! knows its statement, how its inputs split into public and private halves,
//! and the predicate that must hold before a proof is issued.

use cosign_core::{CanonicalBytes, CanonicalizationError, ContentDigest, Did, DocumentId, Pseudonym};
use cosign_crypto::{KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::claims::{KycClaim, KycLevel};
use crate::proof::ProofStatement;

const DID_CONTROL_DOMAIN: &str = "cosign/did-control/v1";

/// A DID authentication key vouching for a pseudonym signing key.
///
/// The signature covers canonical `{domain, did, signing_key}`. It is only
/// ever a private input: anyone holding it could tie the signing key to the
/// DID.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidControl {
    /// Authentication key from the DID document.
    pub key: PublicKey,
    /// Signature by `key` over the control message.
    pub signature: Signature,
}

impl DidControl {
    /// The bytes a DID key signs to vouch for `signing_key`.
    pub fn message(did: &Did, signing_key: &PublicKey) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&json!({
            "domain": DID_CONTROL_DOMAIN,
            "did": did,
            "signing_key": signing_key,
        }))
    }

    /// Sign for `signing_key` with a DID authentication key.
    pub fn sign(
        did: &Did,
        did_key: &KeyPair,
        signing_key: &PublicKey,
    ) -> Result<Self, CanonicalizationError> {
        let message = Self::message(did, signing_key)?;
        Ok(Self {
            key: did_key.public_key(),
            signature: did_key.sign_canonical(&message),
        })
    }

    /// Whether the signature vouches for `signing_key` on behalf of `did`.
    pub fn verify(&self, did: &Did, signing_key: &PublicKey) -> Result<(), String> {
        let message = Self::message(did, signing_key).map_err(|e| e.to_string())?;
        match cosign_crypto::verify_canonical(&message, &self.signature, &self.key) {
            Ok(true) => Ok(()),
            Ok(false) => Err("DID control signature does not verify".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl std::fmt::Debug for DidControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidControl").finish_non_exhaustive()
    }
}

/// A request for a proof.
#[derive(Debug, Clone)]
pub enum ProofPayload {
    /// A KYC claim about a DID.
    Claim {
        /// The DID the claim is about. Public.
        subject: Did,
        /// The claim. Private apart from its type and thresholds.
        claim: KycClaim,
    },
    /// A pseudonym was issued to a verified DID and its signing key was
    /// vouched for by that DID. The DID and the vouching key stay private.
    SignerBinding {
        /// The verified DID. Private.
        subject: Did,
        /// DID key signature over `signing_key`. Private.
        control: DidControl,
        /// The issued pseudonym.
        pseudonym: Pseudonym,
        /// Key the pseudonym signs with.
        signing_key: PublicKey,
        /// The level verified.
        kyc_level: KycLevel,
        /// Digest over the identity proofs that were accepted.
        claims_digest: ContentDigest,
    },
    /// A signer's key signed a document. Key and signature stay private.
    DocumentSignature {
        /// The document signed.
        document_id: DocumentId,
        /// The signer.
        pseudonym: Pseudonym,
        /// Content hash of the document.
        content_hash: ContentDigest,
        /// SHA-256 of the signature bytes.
        signature_hash: ContentDigest,
        /// The exact bytes that were signed.
        message: Vec<u8>,
        /// The signature.
        signature: Signature,
        /// The signer's public key.
        public_key: PublicKey,
    },
}

impl ProofPayload {
    /// The statement a proof over this payload attests to.
    pub fn statement(&self) -> ProofStatement {
        match self {
            Self::Claim { claim, .. } => ProofStatement::Kyc(claim.claim_type()),
            Self::SignerBinding { .. } => ProofStatement::SignerBinding,
            Self::DocumentSignature { .. } => ProofStatement::DocumentSignature,
        }
    }

    /// Inputs a verifier sees.
    pub fn public_inputs(&self) -> Value {
        match self {
            Self::Claim { subject, claim } => json!({
                "claim_type": claim.claim_type(),
                "subject": subject,
                "constraints": claim.public_inputs(),
            }),
            Self::SignerBinding {
                pseudonym,
                signing_key,
                kyc_level,
                claims_digest,
                ..
            } => json!({
                "pseudonym": pseudonym,
                "signing_key": signing_key,
                "kyc_level": kyc_level,
                "claims_digest": claims_digest.to_hex(),
            }),
            Self::DocumentSignature {
                document_id,
                pseudonym,
                content_hash,
                signature_hash,
                ..
            } => json!({
                "document_id": document_id,
                "pseudonym": pseudonym,
                "content_hash": content_hash.to_hex(),
                "signature_hash": signature_hash.to_hex(),
            }),
        }
    }

    /// Witness data, never revealed by the proof.
    pub fn private_inputs(&self) -> Value {
        match self {
            Self::Claim { claim, .. } => claim.private_inputs(),
            Self::SignerBinding {
                subject, control, ..
            } => json!({
                "subject": subject,
                "did_key": control.key,
                "control_signature": control.signature,
            }),
            Self::DocumentSignature {
                message,
                signature,
                public_key,
                ..
            } => json!({
                "message": cosign_core::hex::encode(message),
                "signature": signature,
                "public_key": public_key,
            }),
        }
    }

    /// Evaluate the predicate. `Err` carries the reason it does not hold.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Self::Claim { claim, .. } => claim.check(),
            Self::SignerBinding {
                subject,
                control,
                signing_key,
                ..
            } => control.verify(subject, signing_key),
            Self::DocumentSignature {
                signature_hash,
                message,
                signature,
                public_key,
                ..
            } => {
                if cosign_core::sha256_raw(signature.as_bytes()) != *signature_hash {
                    return Err("signature hash does not match signature".to_string());
                }
                match cosign_crypto::verify(message, signature, public_key) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("signature does not verify".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
        }
    }
}
