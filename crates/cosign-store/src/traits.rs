//! # Storage Traits
//!
//! A transactional collection store keyed by `(collection, id)`. Records are
//! JSON objects. Reads outside a transaction see committed data only.
//!
//! ## Transaction contract
//!
//! - Writes staged in a [`Transaction`] become visible atomically on
//!   [`Transaction::commit`].
//! - [`Transaction::rollback`] discards them. Dropping an unfinished
//!   transaction also discards them, so a cancelled or timed-out operation
//!   leaves no partial state.
//! - Writers are serialized: at most one transaction is open at a time per
//!   store, so a read-check-write inside a transaction cannot race another
//!   writer.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Read access plus the ability to open transactions.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a committed record.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// All committed records of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StorageError>;

    /// Open a session-scoped transaction. Waits for any open transaction to
    /// finish.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError>;
}

/// A session-scoped unit of work.
#[async_trait]
pub trait Transaction: Send {
    /// Fetch a record, seeing this transaction's own staged writes.
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or replace a record. The id is `record["id"]` when it is a
    /// string, otherwise a fresh UUID that is written back into the record.
    async fn store(&mut self, collection: &str, record: Value) -> Result<String, StorageError>;

    /// Shallow-merge `patch` into an existing record. `false` if absent.
    async fn update(
        &mut self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<bool, StorageError>;

    /// Remove a record. `false` if absent.
    async fn delete(&mut self, collection: &str, id: &str) -> Result<bool, StorageError>;

    /// Apply all staged writes atomically.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discard all staged writes.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

/// Run a storage future under a deadline, folding expiry into
/// [`StorageError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    cosign_core::deadline::within(limit, operation, fut).await?
}
