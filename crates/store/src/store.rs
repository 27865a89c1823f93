//! The `Store` trait: a key-value contract with pattern-match key enumeration.
//!
//! This is the boundary the distilled spec calls an external collaborator —
//! a real deployment points it at Redis, etcd, or similar. What's shipped
//! here is the trait plus an in-memory reference implementation that
//! satisfies it exactly, so the coordinator and worker runtimes never need
//! to know which backend they're talking to.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[async_trait]
pub trait Store: Send + Sync {
    /// Read the opaque bytes at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write `value` at `key`, overwriting any prior value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove `key`. Not an error if it was already absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Enumerate keys starting with `prefix`. Order is unspecified; callers
    /// that need a specific order (e.g. checkpoints by progress) sort
    /// client-side.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// JSON convenience layer over [`Store`]'s opaque bytes.
#[async_trait]
pub trait StoreJsonExt: Store {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|source| StoreError::Decode { key: key.to_string(), source })?;
                Ok(Some(value))
            }
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|source| StoreError::Encode { key: key.to_string(), source })?;
        self.set(key, bytes).await
    }
}

impl<T: Store + ?Sized> StoreJsonExt for T {}
