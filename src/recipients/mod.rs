//! The alert recipient registry.
//!
//! Recipients live as a single JSON blob in the state store. Every
//! operation reads the blob fresh, so a mutation is visible to the very
//! next dispatch fan-out without any cache invalidation.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::{
    models::{Recipient, RecipientSpec, RecipientValidationError},
    persistence::{error::PersistenceError, traits::KeyValueStore},
};

/// The state-store key holding the recipient set.
pub const RECIPIENTS_STATE_KEY: &str = "alert_recipients";

/// Errors that can occur within the recipient registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The submitted recipient is invalid.
    #[error(transparent)]
    Validation(#[from] RecipientValidationError),

    /// No recipient exists with the given id.
    #[error("Recipient {0} not found")]
    NotFound(u64),

    /// The state store failed.
    #[error("State repository error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// CRUD over the notification recipient set.
pub struct RecipientRegistry<T: KeyValueStore> {
    store: Arc<T>,
}

impl<T: KeyValueStore> RecipientRegistry<T> {
    /// Creates a registry backed by the given state store.
    pub fn new(store: Arc<T>) -> Self {
        Self { store }
    }

    /// All registered recipients, active or not.
    pub async fn list(&self) -> Result<Vec<Recipient>, RegistryError> {
        Ok(self
            .store
            .get_json_state::<Vec<Recipient>>(RECIPIENTS_STATE_KEY)
            .await?
            .unwrap_or_default())
    }

    /// The recipients participating in dispatch fan-out.
    pub async fn list_active(&self) -> Result<Vec<Recipient>, RegistryError> {
        let mut recipients = self.list().await?;
        recipients.retain(|r| r.is_active);
        Ok(recipients)
    }

    /// Registers a new recipient.
    ///
    /// Rejects specs with a missing channel address, a non-E.164 phone or a
    /// phone already registered to another recipient. Nothing is applied on
    /// rejection.
    pub async fn add(&self, spec: RecipientSpec) -> Result<Recipient, RegistryError> {
        spec.validate()?;

        let mut recipients = self.list().await?;

        if let Some(phone) = spec.phone.as_deref() {
            let phone = phone.trim();
            if recipients.iter().any(|r| r.phone.as_deref() == Some(phone)) {
                return Err(RecipientValidationError::DuplicatePhone(phone.to_string()).into());
            }
        }

        let id = recipients.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let recipient = Recipient {
            id,
            name: spec.name.trim().to_string(),
            telegram_chat_id: spec.telegram_chat_id,
            email: spec.email,
            phone: spec.phone.map(|p| p.trim().to_string()),
            role: spec.role,
            is_active: true,
            channels: spec.channels,
            created_at: Utc::now(),
        };

        recipients.push(recipient.clone());
        self.store.set_json_state(RECIPIENTS_STATE_KEY, &recipients).await?;

        tracing::info!(id, name = %recipient.name, "Recipient registered.");
        Ok(recipient)
    }

    /// Deletes a recipient. Deleting an unknown id is a no-op, matching the
    /// idempotent delete of the settings service.
    pub async fn remove(&self, id: u64) -> Result<(), RegistryError> {
        let mut recipients = self.list().await?;
        let before = recipients.len();
        recipients.retain(|r| r.id != id);
        if recipients.len() != before {
            self.store.set_json_state(RECIPIENTS_STATE_KEY, &recipients).await?;
            tracing::info!(id, "Recipient removed.");
        }
        Ok(())
    }

    /// Flips a recipient's active flag, keeping its configuration intact.
    pub async fn toggle_active(&self, id: u64) -> Result<Recipient, RegistryError> {
        let mut recipients = self.list().await?;
        let recipient =
            recipients.iter_mut().find(|r| r.id == id).ok_or(RegistryError::NotFound(id))?;

        recipient.is_active = !recipient.is_active;
        let toggled = recipient.clone();
        self.store.set_json_state(RECIPIENTS_STATE_KEY, &recipients).await?;

        tracing::info!(id, active = toggled.is_active, "Recipient toggled.");
        Ok(toggled)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{models::Channel, persistence::sqlite::SqliteStateRepository};

    async fn setup_registry() -> RecipientRegistry<SqliteStateRepository> {
        let repo = SqliteStateRepository::new("sqlite::memory:")
            .await
            .expect("Failed to set up in-memory database");
        repo.run_migrations().await.expect("Failed to run migrations");
        RecipientRegistry::new(Arc::new(repo))
    }

    fn telegram_spec(name: &str, chat_id: &str) -> RecipientSpec {
        RecipientSpec {
            name: name.to_string(),
            telegram_chat_id: Some(chat_id.to_string()),
            channels: BTreeSet::from([Channel::Telegram]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_incrementing_ids() {
        let registry = setup_registry().await;

        let first = registry.add(telegram_spec("One", "101")).await.unwrap();
        let second = registry.add(telegram_spec("Two", "102")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.is_active);
        assert_eq!(registry.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_rejects_missing_channel_address() {
        let registry = setup_registry().await;
        let spec = RecipientSpec {
            name: "No Chat Id".to_string(),
            channels: BTreeSet::from([Channel::Telegram]),
            ..Default::default()
        };

        let result = registry.add(spec).await;

        assert!(matches!(
            result,
            Err(RegistryError::Validation(RecipientValidationError::MissingChannelAddress(
                Channel::Telegram
            )))
        ));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_phone() {
        let registry = setup_registry().await;
        let sms_spec = |name: &str| RecipientSpec {
            name: name.to_string(),
            phone: Some("+919876543210".to_string()),
            channels: BTreeSet::from([Channel::Sms]),
            ..Default::default()
        };

        registry.add(sms_spec("First")).await.unwrap();
        let result = registry.add(sms_spec("Second")).await;

        assert!(matches!(
            result,
            Err(RegistryError::Validation(RecipientValidationError::DuplicatePhone(_)))
        ));
    }

    #[tokio::test]
    async fn test_toggle_excludes_from_active_listing() {
        let registry = setup_registry().await;
        let recipient = registry.add(telegram_spec("Ops", "101")).await.unwrap();

        let toggled = registry.toggle_active(recipient.id).await.unwrap();

        assert!(!toggled.is_active);
        assert!(registry.list_active().await.unwrap().is_empty());
        // Still retained with its configuration.
        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].telegram_chat_id.as_deref(), Some("101"));

        // Toggling back restores fan-out participation.
        let restored = registry.toggle_active(recipient.id).await.unwrap();
        assert!(restored.is_active);
        assert_eq!(registry.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_is_not_found() {
        let registry = setup_registry().await;
        assert!(matches!(registry.toggle_active(99).await, Err(RegistryError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = setup_registry().await;
        let recipient = registry.add(telegram_spec("Ops", "101")).await.unwrap();

        registry.remove(recipient.id).await.unwrap();
        registry.remove(recipient.id).await.unwrap();

        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_reads_fresh_state() {
        // A second registry over the same store sees mutations immediately,
        // which is what guarantees fan-out reads fresh recipients.
        let repo = Arc::new(
            SqliteStateRepository::new("sqlite::memory:").await.expect("in-memory database"),
        );
        repo.run_migrations().await.unwrap();
        let writer = RecipientRegistry::new(Arc::clone(&repo));
        let reader = RecipientRegistry::new(Arc::clone(&repo));

        writer.add(telegram_spec("Ops", "101")).await.unwrap();

        assert_eq!(reader.list_active().await.unwrap().len(), 1);
    }
}
