// src/cache/mod.rs
//! Key-value persistence gateway used for posted-status records.

pub mod file;
pub mod memory;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::TrackerError;

pub use file::FileCache;
pub use memory::MemoryCache;

#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    /// Overwrites whatever was stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Typed read. A payload that does not match `T` is a `MalformedRecord`.
pub async fn read_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, TrackerError> {
    let raw = cache
        .get(key)
        .await
        .map_err(|source| TrackerError::PersistenceRead {
            key: key.to_string(),
            source,
        })?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(|source| TrackerError::MalformedRecord {
                key: key.to_string(),
                source,
            }),
    }
}

pub async fn write_json<T: Serialize + ?Sized>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
) -> Result<(), TrackerError> {
    let v = serde_json::to_value(value).map_err(|e| TrackerError::PersistenceWrite {
        key: key.to_string(),
        source: e.into(),
    })?;
    cache
        .set(key, v)
        .await
        .map_err(|source| TrackerError::PersistenceWrite {
            key: key.to_string(),
            source,
        })
}

/// Reject keys that could escape a file-backed root.
pub fn validate_key(key: &str) -> Result<(), TrackerError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(TrackerError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
