//! The authoritative threshold configuration store.
//!
//! The store holds the in-memory configuration every component classifies
//! against, keeps it synchronized with the optional remote settings service
//! and mirrors it into the local state store so the daemon keeps working
//! offline. Concurrent edits from different clients resolve by explicit
//! last-write-wins on the modification timestamp.

mod remote;

use std::sync::Arc;

use tokio::sync::RwLock;

pub use remote::{HttpSettingsApi, SettingsApi, SettingsApiError};
#[cfg(test)]
pub use remote::MockSettingsApi;

use crate::{
    models::{ThresholdConfig, ThresholdConfigError, ThresholdUpdate},
    persistence::traits::KeyValueStore,
};

/// The state-store key holding the local settings snapshot.
pub const SETTINGS_STATE_KEY: &str = "threshold_config";

/// The settings store.
///
/// Single writer of the [`ThresholdConfig`] singleton. Reads are cheap
/// clones; the polling scheduler calls [`SettingsStore::load`] on the
/// settings-refresh cadence so one admin's change becomes visible to every
/// connected client within one interval.
pub struct SettingsStore<T: KeyValueStore> {
    current: RwLock<ThresholdConfig>,
    remote: Option<Arc<dyn SettingsApi>>,
    local: Arc<T>,
}

impl<T: KeyValueStore> SettingsStore<T> {
    /// Creates a store starting from the compiled-in defaults.
    pub fn new(remote: Option<Arc<dyn SettingsApi>>, local: Arc<T>) -> Self {
        Self { current: RwLock::new(ThresholdConfig::defaults()), remote, local }
    }

    /// The current configuration.
    pub async fn current(&self) -> ThresholdConfig {
        self.current.read().await.clone()
    }

    /// Refreshes the configuration: remote first, local snapshot on remote
    /// failure, compiled defaults when neither exists.
    ///
    /// Adoption is explicit last-write-wins: a fetched configuration
    /// replaces the current one only when the current one is not strictly
    /// newer. Never fails; transport problems are logged and the last-known
    /// configuration stays in effect.
    pub async fn load(&self) -> ThresholdConfig {
        if let Some(remote) = &self.remote {
            match remote.fetch().await {
                Ok(fetched) => {
                    self.adopt(fetched, "remote").await;
                    let current = self.current().await;
                    self.persist_local(&current).await;
                    return current;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load settings from remote service, falling back to local snapshot.");
                }
            }
        }

        match self.local.get_json_state::<ThresholdConfig>(SETTINGS_STATE_KEY).await {
            Ok(Some(snapshot)) => self.adopt(snapshot, "local snapshot").await,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read local settings snapshot.");
            }
        }

        self.current().await
    }

    /// Merges a partial update onto the current configuration and persists
    /// it.
    ///
    /// The merged result is validated before anything is applied. On remote
    /// success the server's canonical echo is adopted; on remote failure the
    /// local merge still applies and is persisted locally, so the dashboard
    /// keeps working offline.
    pub async fn save(
        &self,
        update: &ThresholdUpdate,
        actor: &str,
    ) -> Result<ThresholdConfig, ThresholdConfigError> {
        let current = self.current().await;
        let merged = update.apply_to(&current, actor);
        merged.validate()?;

        let adopted = match &self.remote {
            Some(remote) => match remote.persist(&merged).await {
                Ok(canonical) => canonical,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to persist settings remotely, applying local merge only.");
                    merged
                }
            },
            None => merged,
        };

        self.persist_local(&adopted).await;
        *self.current.write().await = adopted.clone();
        tracing::info!(actor, tds_threshold = adopted.tds_threshold, "Settings saved.");
        Ok(adopted)
    }

    /// Reverts to the compiled-in defaults, remotely when possible.
    ///
    /// The local snapshot is cleared either way; on remote failure the
    /// defaults are stamped locally so the reset is observable immediately.
    pub async fn reset_to_defaults(&self) -> ThresholdConfig {
        let adopted = match &self.remote {
            Some(remote) => match remote.reset().await {
                Ok(canonical) => canonical,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to reset settings remotely, reverting locally.");
                    Self::stamped_defaults()
                }
            },
            None => Self::stamped_defaults(),
        };

        if let Err(e) = self.local.delete_state(SETTINGS_STATE_KEY).await {
            tracing::warn!(error = %e, "Failed to clear local settings snapshot.");
        }
        *self.current.write().await = adopted.clone();
        tracing::info!("Settings reset to defaults.");
        adopted
    }

    /// The defaults stamped with the reset time, so the reset itself wins
    /// last-write-wins against the state it replaced.
    fn stamped_defaults() -> ThresholdConfig {
        ThresholdConfig {
            last_modified: chrono::Utc::now(),
            ..ThresholdConfig::defaults()
        }
    }

    /// Adopts `candidate` unless the current configuration is strictly
    /// newer.
    async fn adopt(&self, candidate: ThresholdConfig, source: &str) {
        let mut current = self.current.write().await;
        if current.is_newer_than(&candidate) {
            tracing::debug!(
                source,
                current_modified = %current.last_modified,
                candidate_modified = %candidate.last_modified,
                "Keeping current settings: candidate loses last-write-wins."
            );
            return;
        }
        if *current != candidate {
            tracing::info!(source, modified_by = %candidate.modified_by, "Adopted settings.");
        }
        *current = candidate;
    }

    /// Mirrors a configuration into the local state store. Failures are
    /// logged, not propagated: the in-memory configuration already applies.
    async fn persist_local(&self, config: &ThresholdConfig) {
        if let Err(e) = self.local.set_json_state(SETTINGS_STATE_KEY, config).await {
            tracing::warn!(error = %e, "Failed to persist local settings snapshot.");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use mockall::predicate::eq;

    use super::*;
    use crate::persistence::traits::MockKeyValueStore;

    fn config_modified_at(offset_secs: i64, by: &str) -> ThresholdConfig {
        ThresholdConfig {
            last_modified: Utc::now() + ChronoDuration::seconds(offset_secs),
            modified_by: by.to_string(),
            ..ThresholdConfig::defaults()
        }
    }

    fn store_with(
        remote: Option<MockSettingsApi>,
        local: MockKeyValueStore,
    ) -> SettingsStore<MockKeyValueStore> {
        SettingsStore::new(
            remote.map(|r| Arc::new(r) as Arc<dyn SettingsApi>),
            Arc::new(local),
        )
    }

    #[tokio::test]
    async fn test_load_adopts_remote_config() {
        let remote_config = config_modified_at(0, "admin");
        let expected = remote_config.clone();

        let mut remote = MockSettingsApi::new();
        remote.expect_fetch().times(1).returning(move || Ok(remote_config.clone()));

        let mut local = MockKeyValueStore::new();
        local
            .expect_set_json_state::<ThresholdConfig>()
            .withf(move |key, config| key == SETTINGS_STATE_KEY && config.modified_by == "admin")
            .times(1)
            .returning(|_, _| Ok(()));

        let store = store_with(Some(remote), local);
        let loaded = store.load().await;

        assert_eq!(loaded.modified_by, expected.modified_by);
        assert_eq!(loaded.last_modified, expected.last_modified);
    }

    #[tokio::test]
    async fn test_load_keeps_current_when_remote_is_older() {
        // A remote snapshot older than the locally-applied save must lose
        // the explicit last-write-wins comparison.
        let stale_remote = config_modified_at(-3600, "other-client");

        let mut remote = MockSettingsApi::new();
        let stale_clone = stale_remote.clone();
        remote.expect_fetch().returning(move || Ok(stale_clone.clone()));
        remote
            .expect_persist()
            .returning(|config| Ok(config.clone()));

        let mut local = MockKeyValueStore::new();
        local
            .expect_set_json_state::<ThresholdConfig>()
            .returning(|_, _| Ok(()));

        let store = store_with(Some(remote), local);
        let saved = store
            .save(
                &ThresholdUpdate { tds_threshold: Some(180.0), ..Default::default() },
                "ops",
            )
            .await
            .unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.tds_threshold, 180.0);
        assert_eq!(loaded.last_modified, saved.last_modified);
        assert_ne!(loaded.modified_by, stale_remote.modified_by);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_local_snapshot() {
        let snapshot = config_modified_at(0, "admin");
        let expected_by = snapshot.modified_by.clone();

        let mut remote = MockSettingsApi::new();
        remote
            .expect_fetch()
            .times(1)
            .returning(|| Err(SettingsApiError::Rejected("unreachable".to_string())));

        let mut local = MockKeyValueStore::new();
        local
            .expect_get_json_state::<ThresholdConfig>()
            .with(eq(SETTINGS_STATE_KEY))
            .times(1)
            .returning(move |_| Ok(Some(snapshot.clone())));

        let store = store_with(Some(remote), local);
        let loaded = store.load().await;

        assert_eq!(loaded.modified_by, expected_by);
    }

    #[tokio::test]
    async fn test_load_with_nothing_available_keeps_defaults() {
        let mut local = MockKeyValueStore::new();
        local
            .expect_get_json_state::<ThresholdConfig>()
            .returning(|_| Ok(None));

        let store = store_with(None, local);
        let loaded = store.load().await;

        assert_eq!(loaded.tds_threshold, 150.0);
        assert_eq!(loaded.temp_threshold, 35.0);
        assert_eq!(loaded.modified_by, "system");
    }

    #[tokio::test]
    async fn test_save_adopts_server_canonical_config() {
        // The server normalizes the saved value; its echo is authoritative.
        let mut remote = MockSettingsApi::new();
        remote.expect_persist().times(1).returning(|config| {
            let mut canonical = config.clone();
            canonical.tds_threshold = canonical.tds_threshold.round();
            Ok(canonical)
        });

        let mut local = MockKeyValueStore::new();
        local
            .expect_set_json_state::<ThresholdConfig>()
            .times(1)
            .returning(|_, _| Ok(()));

        let store = store_with(Some(remote), local);
        let saved = store
            .save(
                &ThresholdUpdate { tds_threshold: Some(175.4), ..Default::default() },
                "ops",
            )
            .await
            .unwrap();

        assert_eq!(saved.tds_threshold, 175.0);
        assert_eq!(store.current().await.tds_threshold, 175.0);
    }

    #[tokio::test]
    async fn test_save_applies_local_merge_when_remote_fails() {
        let mut remote = MockSettingsApi::new();
        remote
            .expect_persist()
            .times(1)
            .returning(|_| Err(SettingsApiError::Rejected("unreachable".to_string())));

        let mut local = MockKeyValueStore::new();
        local
            .expect_set_json_state::<ThresholdConfig>()
            .withf(|key, config| key == SETTINGS_STATE_KEY && config.tds_threshold == 200.0)
            .times(1)
            .returning(|_, _| Ok(()));

        let store = store_with(Some(remote), local);
        let saved = store
            .save(
                &ThresholdUpdate { tds_threshold: Some(200.0), ..Default::default() },
                "ops",
            )
            .await
            .unwrap();

        assert_eq!(saved.tds_threshold, 200.0);
        assert_eq!(saved.modified_by, "ops");
        assert_eq!(store.current().await.tds_threshold, 200.0);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_update_without_applying() {
        let local = MockKeyValueStore::new(); // No store interaction expected.
        let store = store_with(None, local);

        let result = store
            .save(
                &ThresholdUpdate { tds_threshold: Some(-5.0), ..Default::default() },
                "ops",
            )
            .await;

        assert!(matches!(result, Err(ThresholdConfigError::NonPositiveTdsThreshold(_))));
        assert_eq!(store.current().await.tds_threshold, 150.0);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults_after_custom_save() {
        let mut local = MockKeyValueStore::new();
        local
            .expect_set_json_state::<ThresholdConfig>()
            .returning(|_, _| Ok(()));
        local
            .expect_delete_state()
            .with(eq(SETTINGS_STATE_KEY))
            .times(1)
            .returning(|_| Ok(()));

        let store = store_with(None, local);
        store
            .save(
                &ThresholdUpdate {
                    tds_threshold: Some(300.0),
                    temp_threshold: Some(45.0),
                    ..Default::default()
                },
                "ops",
            )
            .await
            .unwrap();

        let reset = store.reset_to_defaults().await;

        assert_eq!(reset.tds_threshold, 150.0);
        assert_eq!(reset.temp_threshold, 35.0);
        assert_eq!(store.current().await.tds_threshold, 150.0);
    }
}
