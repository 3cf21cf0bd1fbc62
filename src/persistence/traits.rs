//! The state management interface for the Undine application.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Serialize, de::DeserializeOwned};

use super::error::PersistenceError;

/// A generic key-value store for JSON-encoded state blobs.
///
/// Components that own a slice of application state (settings snapshot,
/// recipient set, cooldown timers, alert history) read and write it through
/// this trait, so units can run against a mock and the daemon against
/// SQLite.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves and decodes the state blob under `key`, if present.
    async fn get_json_state<T: DeserializeOwned + Send + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError>;

    /// Encodes `value` and stores it under `key`, replacing any prior blob.
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError>;

    /// Removes the state blob under `key`. Removing an absent key is not an
    /// error.
    async fn delete_state(&self, key: &str) -> Result<(), PersistenceError>;

    /// Ensures all pending writes are flushed to disk.
    async fn flush(&self) -> Result<(), PersistenceError>;
}
