//! Documents, signatures and the attempt log.

use std::collections::BTreeSet;

use cosign_core::{ContentDigest, Did, DocumentId, Pseudonym, Timestamp};
use cosign_crypto::Signature;
use cosign_store::Record;
use cosign_zkp::Proof;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document. Moves only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// No required signers yet.
    Draft,
    /// Collecting signatures.
    Pending,
    /// Every required signer has signed.
    Signed,
}

impl DocumentStatus {
    /// Canonical state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Signed => "SIGNED",
        }
    }

    /// Parse a canonical state name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DRAFT" => Some(Self::Draft),
            "PENDING" => Some(Self::Pending),
            "SIGNED" => Some(Self::Signed),
            _ => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Signed)
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [DocumentStatus] {
        match self {
            Self::Draft => &[Self::Pending],
            Self::Pending => &[Self::Signed],
            Self::Signed => &[],
        }
    }

    /// Whether `to` is reachable in one step.
    pub fn can_transition_to(&self, to: DocumentStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document awaiting or holding co-signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id.
    pub id: DocumentId,
    /// Digest of the document content.
    pub content_hash: ContentDigest,
    /// DID of the creator.
    pub owner: Did,
    /// Lifecycle state.
    pub status: DocumentStatus,
    /// Pseudonyms that must all sign.
    pub required_signers: BTreeSet<Pseudonym>,
    /// Creation time.
    pub created: Timestamp,
    /// Last change.
    pub updated: Timestamp,
    /// When the last required signature landed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<Timestamp>,
}

impl Document {
    /// Whether `pseudonym` must sign.
    pub fn requires(&self, pseudonym: &Pseudonym) -> bool {
        self.required_signers.contains(pseudonym)
    }
}

impl Record for Document {
    const COLLECTION: &'static str = "documents";

    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

/// The signature that counts for one signer on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    /// The document.
    pub document_id: DocumentId,
    /// The signer.
    pub signer_pseudonym: Pseudonym,
    /// Time inside the signed payload.
    pub timestamp: Timestamp,
    /// SHA-256 of `signature`.
    pub signature_hash: ContentDigest,
    /// Ed25519 signature over the canonical signing payload.
    pub signature: Signature,
    /// Oracle proof binding the signature to the pseudonym.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_proof: Option<Proof>,
}

impl SignatureData {
    /// Storage id for a `(document, signer)` pair.
    pub fn key(document_id: &DocumentId, pseudonym: &Pseudonym) -> String {
        format!("{document_id}:{pseudonym}")
    }
}

impl Record for SignatureData {
    const COLLECTION: &'static str = "signatures";

    fn record_id(&self) -> String {
        Self::key(&self.document_id, &self.signer_pseudonym)
    }
}

/// How a signing attempt was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// First signature by this signer.
    Recorded,
    /// Replaced the signer's earlier signature.
    Resubmitted,
}

/// One accepted signing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAttempt {
    /// The signer.
    pub pseudonym: Pseudonym,
    /// SHA-256 of the signature.
    pub signature_hash: ContentDigest,
    /// When it was made.
    pub timestamp: Timestamp,
    /// How it was applied.
    pub outcome: AttemptOutcome,
}

/// Append-only log of signing attempts on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLog {
    /// The document.
    pub document_id: DocumentId,
    /// Attempts in order.
    pub attempts: Vec<SignatureAttempt>,
}

impl Record for AttemptLog {
    const COLLECTION: &'static str = "signature_attempts";

    fn record_id(&self) -> String {
        self.document_id.to_string()
    }
}
