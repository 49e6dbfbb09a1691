use async_trait::async_trait;
use keyring::Entry;

use super::{SecureBackend, validate_key};
use crate::error::PersistError;

pub const SERVICE_NAME: &str = "PocketPersist";

/// Entries in the OS credential store, one per key.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Run one keyring call off the async runtime; the platform APIs block.
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, PersistError>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> Result<T, PersistError> + Send + 'static,
    {
        validate_key(key)?;
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)
                .map_err(|e| PersistError::SecureStore(format!("keyring init: {e}")))?;
            op(&entry)
        })
        .await
        .map_err(|e| PersistError::SecureStore(format!("keyring task failed: {e}")))?
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

#[async_trait]
impl SecureBackend for KeyringBackend {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let value = value.to_string();
        self.with_entry(key, move |entry| {
            entry
                .set_password(&value)
                .map_err(|e| PersistError::SecureStore(format!("store: {e}")))
        })
        .await
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(PersistError::SecureStore(format!("load: {e}"))),
        })
        .await
    }

    async fn delete_item(&self, key: &str) -> Result<(), PersistError> {
        self.with_entry(key, |entry| match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(PersistError::SecureStore(format!("delete: {e}"))),
        })
        .await
    }
}
