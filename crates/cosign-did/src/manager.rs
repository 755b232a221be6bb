//! # DID Manager
//!
//! Lifecycle per DID: `Unregistered -> ACTIVE -> REVOKED`. Revoked records
//! stay in storage and keep resolving, so signatures made under them remain
//! auditable.
//!
//! Every mutation runs in its own storage transaction. Reads that decide a
//! mutation happen inside that transaction; the store serializes writers,
//! so check-then-write cannot race.

use std::sync::Arc;
use std::time::Duration;

use cosign_core::{Did, Timestamp};
use cosign_crypto::{derive_address, Address, PublicKey};
use cosign_store::{bounded, load, load_committed, save, Record, Storage, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::DidDocument;
use crate::error::DidError;
use crate::patch::SignedDidPatch;

/// Default bound on each storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a stored DID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DidStatus {
    /// Resolvable and updatable.
    Active,
    /// Resolvable, frozen.
    Revoked,
}

impl DidStatus {
    /// Canonical state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Revoked => "REVOKED",
        }
    }

    /// Parse a canonical state name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ACTIVE" => Some(Self::Active),
            "REVOKED" => Some(Self::Revoked),
            _ => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [DidStatus] {
        match self {
            Self::Active => &[Self::Revoked],
            Self::Revoked => &[],
        }
    }
}

impl std::fmt::Display for DidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DID document with its lifecycle metadata, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidRecord {
    /// Current document.
    pub document: DidDocument,
    /// Lifecycle state.
    pub status: DidStatus,
    /// Starts at 1, bumped by each update.
    pub version: u64,
    /// Set on revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl DidRecord {
    /// Whether the DID may still be used.
    pub fn is_active(&self) -> bool {
        self.status == DidStatus::Active
    }
}

impl Record for DidRecord {
    const COLLECTION: &'static str = "dids";

    fn record_id(&self) -> String {
        self.document.id.to_string()
    }
}

/// Creates, resolves, updates and revokes DIDs of one method.
pub struct DidManager {
    storage: Arc<dyn Storage>,
    method: String,
    timeout: Duration,
}

impl std::fmt::Debug for DidManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidManager")
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DidManager {
    /// Manager for `did:<method>:...` identifiers.
    pub fn new(storage: Arc<dyn Storage>, method: impl Into<String>) -> Result<Self, DidError> {
        let method = method.into();
        let valid = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid {
            return Err(DidError::InvalidMethod(method));
        }
        Ok(Self {
            storage,
            method,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        })
    }

    /// Override the per-call storage timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The DID method this manager issues.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Create a DID for `public_key`. `address` must be the key's derived
    /// address; it becomes the method-specific identifier.
    pub async fn create_did(
        &self,
        address: &Address,
        public_key: &PublicKey,
    ) -> Result<Did, DidError> {
        if derive_address(public_key) != *address {
            warn!(address = %address, "create_did rejected: address mismatch");
            return Err(DidError::AddressMismatch {
                address: address.to_string(),
            });
        }
        let did = Did::from_parts(&self.method, address.as_str())?;

        let mut tx = self.begin().await?;
        if self.load_in(tx.as_mut(), &did).await?.is_some() {
            self.rollback(tx).await?;
            return Err(DidError::AlreadyExists(did.to_string()));
        }

        let record = DidRecord {
            document: DidDocument::self_controlled(did.clone(), *public_key, Timestamp::now()),
            status: DidStatus::Active,
            version: 1,
            revoked_at: None,
        };
        record.document.validate()?;
        bounded(self.timeout, "did.save", save(tx.as_mut(), &record)).await?;
        bounded(self.timeout, "did.commit", tx.commit()).await?;

        info!(did = %did, "DID created");
        Ok(did)
    }

    /// Resolve a DID to its document. Revoked DIDs still resolve.
    pub async fn resolve_did(&self, id: &str) -> Result<DidDocument, DidError> {
        Ok(self.resolve_record(id).await?.document)
    }

    /// Resolve a DID to its document and lifecycle metadata.
    pub async fn resolve_record(&self, id: &str) -> Result<DidRecord, DidError> {
        let did = Did::new(id)?;
        bounded(
            self.timeout,
            "did.get",
            load_committed::<DidRecord>(self.storage.as_ref(), did.as_str()),
        )
        .await?
        .ok_or_else(|| DidError::NotFound(did.to_string()))
    }

    /// Lifecycle state of a DID.
    pub async fn did_status(&self, id: &str) -> Result<DidStatus, DidError> {
        Ok(self.resolve_record(id).await?.status)
    }

    /// Load an active DID inside a caller's transaction. Used by components
    /// that must check DID state atomically with their own writes.
    pub async fn active_in(
        &self,
        tx: &mut dyn Transaction,
        did: &Did,
    ) -> Result<DidRecord, DidError> {
        let record = self
            .load_in(tx, did)
            .await?
            .ok_or_else(|| DidError::NotFound(did.to_string()))?;
        if !record.is_active() {
            return Err(DidError::Revoked(did.to_string()));
        }
        Ok(record)
    }

    /// Apply a patch signed by one of the document's authentication keys.
    pub async fn update_did(
        &self,
        id: &str,
        signed: &SignedDidPatch,
    ) -> Result<DidDocument, DidError> {
        let did = Did::new(id)?;
        if signed.did != did {
            return Err(DidError::InvalidPatch(format!(
                "patch targets {} not {}",
                signed.did, did
            )));
        }
        if !signed.verify_signature()? {
            warn!(did = %did, "update_did rejected: bad signature");
            return Err(DidError::BadSignature);
        }

        let mut tx = self.begin().await?;
        let record = match self.check_update(tx.as_mut(), &did, signed).await {
            Ok(record) => record,
            Err(e) => {
                self.rollback(tx).await?;
                return Err(e);
            }
        };
        bounded(self.timeout, "did.save", save(tx.as_mut(), &record)).await?;
        bounded(self.timeout, "did.commit", tx.commit()).await?;

        info!(did = %did, version = record.version, "DID updated");
        Ok(record.document)
    }

    /// Mark a DID revoked. Revoking a revoked DID succeeds without change.
    pub async fn revoke_did(&self, id: &str) -> Result<(), DidError> {
        let did = Did::new(id)?;
        let mut tx = self.begin().await?;
        let mut record = match self.load_in(tx.as_mut(), &did).await? {
            Some(record) => record,
            None => {
                self.rollback(tx).await?;
                return Err(DidError::NotFound(did.to_string()));
            }
        };
        if record.status == DidStatus::Revoked {
            self.rollback(tx).await?;
            debug!(did = %did, "revoke_did: already revoked");
            return Ok(());
        }

        let now = Timestamp::now();
        record.status = DidStatus::Revoked;
        record.revoked_at = Some(now);
        record.document.updated = now;
        bounded(self.timeout, "did.save", save(tx.as_mut(), &record)).await?;
        bounded(self.timeout, "did.commit", tx.commit()).await?;

        info!(did = %did, "DID revoked");
        Ok(())
    }

    async fn check_update(
        &self,
        tx: &mut dyn Transaction,
        did: &Did,
        signed: &SignedDidPatch,
    ) -> Result<DidRecord, DidError> {
        let mut record = self.active_in(tx, did).await?;
        if signed.patch.base_version != record.version {
            return Err(DidError::StaleVersion {
                based_on: signed.patch.base_version,
                current: record.version,
            });
        }
        let signer_method = record
            .document
            .authentication_method_for(&signed.signer)
            .map(|m| m.id.clone())
            .ok_or_else(|| DidError::NotController(did.to_string()))?;

        let mut next = signed.patch.apply(&record.document)?;
        let still_authenticates = next
            .authentication_method_for(&signed.signer)
            .is_some_and(|m| m.id == signer_method);
        if !still_authenticates {
            return Err(DidError::SelfLockout(signer_method));
        }
        next.updated = Timestamp::now();
        next.validate()?;

        record.document = next;
        record.version += 1;
        Ok(record)
    }

    async fn load_in(
        &self,
        tx: &mut dyn Transaction,
        did: &Did,
    ) -> Result<Option<DidRecord>, DidError> {
        Ok(bounded(self.timeout, "did.get", load::<DidRecord>(tx, did.as_str())).await?)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, DidError> {
        Ok(bounded(self.timeout, "did.begin", self.storage.begin()).await?)
    }

    async fn rollback(&self, tx: Box<dyn Transaction>) -> Result<(), DidError> {
        Ok(bounded(self.timeout, "did.rollback", tx.rollback()).await?)
    }
}
