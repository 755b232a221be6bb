//! Stored registry records.
//!
//! | Collection | Keyed by | Type |
//! |---|---|---|
//! | `verified_signers` | DID | [`VerifiedSigner`] |
//! | `pseudonym_bindings` | pseudonym | [`PseudonymBinding`] |
//! | `did_bindings` | DID | [`DidBinding`] |
//! | `signer_proofs` | pseudonym | [`SignerProofLog`] |
//!
//! The two binding collections together form the pseudonym-DID bijection.

use cosign_core::{ContentDigest, Did, Pseudonym, Timestamp};
use cosign_crypto::PublicKey;
use cosign_store::Record;
use cosign_zkp::{KycLevel, Proof};
use serde::{Deserialize, Serialize};

/// KYC outcome recorded for a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// Proofs verified; may sign.
    Verified,
    /// Awaiting re-verification.
    Pending,
    /// Rejected; may not sign.
    Rejected,
}

impl KycStatus {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "verified" => Some(Self::Verified),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signer per DID. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSigner {
    /// The verified DID.
    pub did: Did,
    /// Current KYC outcome.
    pub kyc_status: KycStatus,
    /// Level the proofs satisfied.
    pub kyc_level: KycLevel,
    /// When `kyc_status` last changed.
    pub kyc_timestamp: Timestamp,
    /// Key the pseudonym signs documents with. Never a key of `did`.
    pub signing_key: PublicKey,
    /// Issued pseudonym. Immutable once set.
    pub pseudonym: Pseudonym,
    /// Opaque ciphertext supplied by the signer.
    pub encrypted_details: String,
}

impl VerifiedSigner {
    /// Whether the signer may currently sign.
    pub fn is_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }
}

impl Record for VerifiedSigner {
    const COLLECTION: &'static str = "verified_signers";

    fn record_id(&self) -> String {
        self.did.to_string()
    }
}

/// Pseudonym to DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudonymBinding {
    /// The pseudonym.
    pub pseudonym: Pseudonym,
    /// The DID it belongs to.
    pub did: Did,
    /// When the binding was made.
    pub bound_at: Timestamp,
}

impl Record for PseudonymBinding {
    const COLLECTION: &'static str = "pseudonym_bindings";

    fn record_id(&self) -> String {
        self.pseudonym.to_string()
    }
}

/// DID to pseudonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidBinding {
    /// The DID.
    pub did: Did,
    /// Its pseudonym.
    pub pseudonym: Pseudonym,
    /// When the binding was made.
    pub bound_at: Timestamp,
}

impl Record for DidBinding {
    const COLLECTION: &'static str = "did_bindings";

    fn record_id(&self) -> String {
        self.did.to_string()
    }
}

/// Why a proof entry was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofEvent {
    /// First registration of the pseudonym.
    Registered,
    /// Registration repeated with a changed outcome.
    Reverified,
}

/// A binding proof issued for a pseudonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerProof {
    /// The pseudonym the proof binds.
    pub pseudonym: Pseudonym,
    /// Digest of `zk_proof`.
    pub proof_hash: ContentDigest,
    /// When it was appended.
    pub timestamp: Timestamp,
    /// Registration or re-verification.
    pub event: ProofEvent,
    /// The oracle proof, public half only.
    pub zk_proof: Proof,
}

/// Append-only audit trail of a pseudonym's binding proofs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerProofLog {
    /// The pseudonym.
    pub pseudonym: Pseudonym,
    /// Entries in append order.
    pub entries: Vec<SignerProof>,
}

impl SignerProofLog {
    /// Empty log for `pseudonym`.
    pub fn new(pseudonym: Pseudonym) -> Self {
        Self {
            pseudonym,
            entries: Vec::new(),
        }
    }

    /// Whether any entry carries `proof_hash`.
    pub fn contains(&self, proof_hash: &ContentDigest) -> bool {
        self.entries.iter().any(|e| e.proof_hash == *proof_hash)
    }
}

impl Record for SignerProofLog {
    const COLLECTION: &'static str = "signer_proofs";

    fn record_id(&self) -> String {
        self.pseudonym.to_string()
    }
}

/// What the rest of the system may know about a signer: no DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerView {
    /// The pseudonym.
    pub pseudonym: Pseudonym,
    /// Current KYC outcome.
    pub kyc_status: KycStatus,
    /// Level verified.
    pub kyc_level: KycLevel,
    /// When `kyc_status` last changed.
    pub kyc_timestamp: Timestamp,
    /// Registered signing key.
    pub signing_key: PublicKey,
}

impl SignerView {
    /// Whether the signer may currently sign.
    pub fn is_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }
}

impl From<&VerifiedSigner> for SignerView {
    fn from(signer: &VerifiedSigner) -> Self {
        Self {
            pseudonym: signer.pseudonym.clone(),
            kyc_status: signer.kyc_status,
            kyc_level: signer.kyc_level,
            kyc_timestamp: signer.kyc_timestamp,
            signing_key: signer.signing_key,
        }
    }
}
