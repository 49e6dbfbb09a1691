use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SecureBackend, validate_key};
use crate::error::PersistError;

/// In-process backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureBackend for MemoryBackend {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), PersistError> {
        validate_key(key)?;
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, PersistError> {
        validate_key(key)?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn delete_item(&self, key: &str) -> Result<(), PersistError> {
        validate_key(key)?;
        self.items.write().await.remove(key);
        Ok(())
    }
}
