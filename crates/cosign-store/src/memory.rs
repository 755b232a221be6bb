//! # In-Memory Store
//!
//! Committed data lives behind a `parking_lot::RwLock` that is never held
//! across `.await`. Writers hold a `tokio` session lock for the life of
//! their transaction; staged writes are applied under one write lock on
//! commit, so readers observe either none or all of a transaction.
//!
//! Fault injection (`set_available`, `fail_next_commits`, `with_latency`)
//! lets tests exercise rollback and timeout paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::{Storage, Transaction};

type Collections = HashMap<String, BTreeMap<String, Value>>;
type StagedKey = (String, String);

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    failing_commits: AtomicU32,
    latency: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    data: RwLock<Collections>,
    session: Arc<Mutex<()>>,
    faults: Faults,
}

/// Thread-safe, cloneable transactional store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    /// Delay every operation, simulating a slow backend.
    pub fn with_latency(latency: Duration) -> Self {
        Self::with_faults(Faults {
            latency: Some(latency),
            ..Faults::default()
        })
    }

    fn with_faults(faults: Faults) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(HashMap::new()),
                session: Arc::new(Mutex::new(())),
                faults,
            }),
        }
    }

    /// Toggle simulated availability. While unavailable every operation
    /// fails with [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner
            .faults
            .unavailable
            .store(!available, Ordering::SeqCst);
    }

    /// Make the next `n` commits fail after their writes were staged.
    pub fn fail_next_commits(&self, n: u32) {
        self.inner.faults.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Number of committed records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .data
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    async fn simulate(&self, operation: &str) -> Result<(), StorageError> {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("{operation}: store offline")));
        }
        Ok(())
    }

    fn committed(&self, collection: &str, id: &str) -> Option<Value> {
        self.data
            .read()
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    fn take_commit_failure(&self) -> bool {
        self.faults
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        self.inner.simulate("get").await?;
        Ok(self.inner.committed(collection, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        self.inner.simulate("list").await?;
        Ok(self
            .inner
            .data
            .read()
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        self.inner.simulate("begin").await?;
        let session = Arc::clone(&self.inner.session).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            store: Arc::clone(&self.inner),
            staged: BTreeMap::new(),
            finished: false,
            _session: session,
        }))
    }
}

/// A transaction over a [`MemoryStore`]. Holds the store's session lock
/// until it commits, rolls back or is dropped.
pub struct MemoryTransaction {
    store: Arc<Inner>,
    staged: BTreeMap<StagedKey, Option<Value>>,
    finished: bool,
    _session: OwnedMutexGuard<()>,
}

impl MemoryTransaction {
    fn current(&self, collection: &str, id: &str) -> Option<Value> {
        match self.staged.get(&(collection.to_string(), id.to_string())) {
            Some(staged) => staged.clone(),
            None => self.store.committed(collection, id),
        }
    }

    fn stage(&mut self, collection: &str, id: &str, value: Option<Value>) {
        self.staged
            .insert((collection.to_string(), id.to_string()), value);
    }
}

fn invalid(collection: &str, reason: &str) -> StorageError {
    StorageError::InvalidRecord {
        collection: collection.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        self.store.simulate("get").await?;
        Ok(self.current(collection, id))
    }

    async fn store(&mut self, collection: &str, mut record: Value) -> Result<String, StorageError> {
        self.store.simulate("store").await?;
        let obj = record
            .as_object_mut()
            .ok_or_else(|| invalid(collection, "record is not a JSON object"))?;
        let existing = match obj.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::String(_)) | None => None,
            Some(_) => return Err(invalid(collection, "record id is not a string")),
        };
        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                obj.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        self.stage(collection, &id, Some(record));
        Ok(id)
    }

    async fn update(
        &mut self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<bool, StorageError> {
        self.store.simulate("update").await?;
        let Value::Object(patch) = patch else {
            return Err(invalid(collection, "patch is not a JSON object"));
        };
        let Some(mut current) = self.current(collection, id) else {
            return Ok(false);
        };
        if let Some(obj) = current.as_object_mut() {
            for (key, value) in patch {
                if key != "id" {
                    obj.insert(key, value);
                }
            }
        }
        self.stage(collection, id, Some(current));
        Ok(true)
    }

    async fn delete(&mut self, collection: &str, id: &str) -> Result<bool, StorageError> {
        self.store.simulate("delete").await?;
        if self.current(collection, id).is_none() {
            return Ok(false);
        }
        self.stage(collection, id, None);
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let mut this = self;
        this.store.simulate("commit").await?;
        if this.store.take_commit_failure() {
            return Err(StorageError::Unavailable(
                "commit: injected failure".to_string(),
            ));
        }
        let staged = std::mem::take(&mut this.staged);
        let writes = staged.len();
        {
            let mut data = this.store.data.write();
            for ((collection, id), value) in staged {
                let records = data.entry(collection).or_default();
                match value {
                    Some(v) => {
                        records.insert(id, v);
                    }
                    None => {
                        records.remove(&id);
                    }
                }
            }
        }
        this.finished = true;
        tracing::trace!(writes, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        let mut this = self;
        let discarded = this.staged.len();
        this.staged.clear();
        this.finished = true;
        tracing::debug!(discarded, "transaction rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            tracing::debug!(
                discarded = self.staged.len(),
                "transaction dropped before commit, rolled back"
            );
        }
    }
}
