//! Typed access to stored records.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;
use crate::traits::{Storage, Transaction};

/// A domain type persisted in a fixed collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the type lives in.
    const COLLECTION: &'static str;

    /// Storage id of this record.
    fn record_id(&self) -> String;
}

fn decode<T: Record>(id: &str, value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
        collection: T::COLLECTION.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Record>(record: &T) -> Result<Value, StorageError> {
    let mut value = serde_json::to_value(record).map_err(|e| StorageError::InvalidRecord {
        collection: T::COLLECTION.to_string(),
        reason: e.to_string(),
    })?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| StorageError::InvalidRecord {
            collection: T::COLLECTION.to_string(),
            reason: "record does not serialize to an object".to_string(),
        })?;
    obj.insert("id".to_string(), Value::String(record.record_id()));
    Ok(value)
}

/// Load a record inside a transaction.
pub async fn load<T: Record>(
    tx: &mut dyn Transaction,
    id: &str,
) -> Result<Option<T>, StorageError> {
    match tx.get(T::COLLECTION, id).await? {
        Some(value) => decode(id, value).map(Some),
        None => Ok(None),
    }
}

/// Load a committed record outside any transaction.
pub async fn load_committed<T: Record>(
    storage: &dyn Storage,
    id: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(T::COLLECTION, id).await? {
        Some(value) => decode(id, value).map(Some),
        None => Ok(None),
    }
}

/// Insert or replace a record inside a transaction.
pub async fn save<T: Record>(tx: &mut dyn Transaction, record: &T) -> Result<(), StorageError> {
    let value = encode(record)?;
    tx.store(T::COLLECTION, value).await?;
    Ok(())
}

/// All committed records of a type.
pub async fn load_all<T: Record>(storage: &dyn Storage) -> Result<Vec<T>, StorageError> {
    storage
        .list(T::COLLECTION)
        .await?
        .into_iter()
        .map(|value| {
            let id = value
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            decode(&id, value)
        })
        .collect()
}
