//! A reusable, thread-safe pool for managing HTTP clients.
//!
//! The feed poller, the remote settings client and each notification channel
//! may carry a different retry policy; the pool creates one client per
//! policy and reuses it, which is what keeps connection pooling effective.

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client as ReqwestClient;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use tokio::sync::RwLock;

use super::client::create_retryable_http_client;
use crate::config::HttpRetryConfig;

/// Errors that can occur within the `HttpClientPool`.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// A pool of retrying HTTP clients keyed by their `HttpRetryConfig`.
///
/// A single instance is shared across the application; different retry
/// strategies result in different, isolated clients.
pub struct HttpClientPool {
    clients: Arc<RwLock<HashMap<String, Arc<ClientWithMiddleware>>>>,
}

impl HttpClientPool {
    /// Creates a new, empty `HttpClientPool`.
    pub fn new() -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Gets an existing HTTP client from the pool or creates a new one if
    /// none exists for the given retry policy.
    ///
    /// Uses a double-checked locking pattern to minimize contention.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        let key = format!("{retry_policy:?}");

        // Fast path: Check if the client already exists with a read lock.
        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        // Slow path: If not found, acquire a write lock to create it.
        let mut clients = self.clients.write().await;
        // Double-check: Another task might have created the client while we
        // were waiting for the write lock.
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let base_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpClientPoolError::HttpClientBuildError(e.to_string()))?;

        let new_client = Arc::new(create_retryable_http_client(retry_policy, base_client));
        clients.insert(key, new_client.clone());

        Ok(new_client)
    }

    /// Returns the number of active HTTP clients in the pool.
    #[cfg(test)]
    pub async fn get_active_client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_init_empty() {
        let pool = HttpClientPool::new();
        assert_eq!(pool.get_active_client_count().await, 0, "Pool should be empty initially");
    }

    #[tokio::test]
    async fn test_pool_returns_same_client_for_same_config() {
        let pool = HttpClientPool::new();
        let retry_config = HttpRetryConfig::default();

        let client1 = pool.get_or_create(&retry_config).await.unwrap();
        let client2 = pool.get_or_create(&retry_config).await.unwrap();

        assert!(Arc::ptr_eq(&client1, &client2), "Should return the same client instance");
        assert_eq!(pool.get_active_client_count().await, 1);
    }

    #[tokio::test]
    async fn test_pool_returns_different_clients_for_different_configs() {
        let pool = HttpClientPool::new();
        let retry_config_1 = HttpRetryConfig::default();
        let retry_config_2 = HttpRetryConfig { max_retries: 5, ..Default::default() };

        let client1 = pool.get_or_create(&retry_config_1).await.unwrap();
        let client2 = pool.get_or_create(&retry_config_2).await.unwrap();

        assert!(
            !Arc::ptr_eq(&client1, &client2),
            "Should return different client instances for different configurations"
        );
        assert_eq!(pool.get_active_client_count().await, 2);
    }

    #[tokio::test]
    async fn test_pool_concurrent_access() {
        let pool = Arc::new(HttpClientPool::new());
        let retry_config = HttpRetryConfig::default();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let pool_clone = Arc::clone(&pool);
                let retry_config = retry_config.clone();
                tokio::spawn(async move {
                    pool_clone.get_or_create(&retry_config).await.is_ok()
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        for result in results {
            assert!(result.unwrap(), "All tasks should obtain a client");
        }
        assert_eq!(pool.get_active_client_count().await, 1);
    }
}
