//! This module provides a concrete implementation of the KeyValueStore
//! using SQLite.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{Row, SqlitePool, sqlite::SqliteConnectOptions};

use super::{error::PersistenceError, traits::KeyValueStore};

/// SQL query constants for state blob operations
mod state_sql {
    /// Select a state blob by key
    pub const SELECT_STATE: &str = "SELECT value FROM app_state WHERE key = ?";

    /// Insert or replace a state blob
    pub const UPSERT_STATE: &str = "INSERT INTO app_state (key, value) VALUES (?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP";

    /// Delete a state blob by key
    pub const DELETE_STATE: &str = "DELETE FROM app_state WHERE key = ?";
}

/// A concrete implementation of the KeyValueStore using SQLite.
pub struct SqliteStateRepository {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Creates a new instance of SqliteStateRepository with the provided database URL.
    /// This will create the database file if it does not exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            e
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Gets access to the underlying connection pool for advanced operations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }
}

#[async_trait]
impl KeyValueStore for SqliteStateRepository {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_json_state<T: DeserializeOwned + Send + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let row = sqlx::query(state_sql::SELECT_STATE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key, "Failed to read state blob.");
                e
            })?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(state_sql::UPSERT_STATE)
            .bind(key)
            .bind(raw)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key, "Failed to write state blob.");
                e
            })?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete_state(&self, key: &str) -> Result<(), PersistenceError> {
        sqlx::query(state_sql::DELETE_STATE).bind(key).execute(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, key, "Failed to delete state blob.");
            e
        })?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        sqlx::query("PRAGMA wal_checkpoint(PASSIVE)").execute(&self.pool).await?;
        Ok(())
    }
}
