use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{SecureBackend, validate_key};
use crate::error::PersistError;

/// Key of the one slot the application uses.
pub const SECURE_KEY: &str = "secureUserData";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearOutcome {
    Cleared,
    /// The slot was already empty; no delete was issued.
    NothingStored,
}

#[derive(Clone)]
pub struct SecureValueStore {
    backend: Arc<dyn SecureBackend>,
    key: String,
}

impl SecureValueStore {
    pub fn new(backend: Arc<dyn SecureBackend>) -> Self {
        Self {
            backend,
            key: SECURE_KEY.to_string(),
        }
    }

    pub fn with_key(backend: Arc<dyn SecureBackend>, key: &str) -> Result<Self, PersistError> {
        validate_key(key)?;
        Ok(Self {
            backend,
            key: key.to_string(),
        })
    }

    /// Blank or whitespace-only values are rejected before the backend is touched.
    pub async fn save(&self, value: &str) -> Result<(), PersistError> {
        if value.trim().is_empty() {
            return Err(PersistError::Validation(
                "enter a value before saving".to_string(),
            ));
        }
        self.backend
            .set_item(&self.key, value)
            .await
            .inspect_err(|e| warn!(key = %self.key, error = %e, "secure save failed"))?;
        info!(key = %self.key, "secure value saved");
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<String>, PersistError> {
        self.backend
            .get_item(&self.key)
            .await
            .inspect_err(|e| warn!(key = %self.key, error = %e, "secure load failed"))
    }

    /// A slot that exists but cannot be decoded is still removed.
    pub async fn clear(&self) -> Result<ClearOutcome, PersistError> {
        let present = match self.backend.get_item(&self.key).await {
            Ok(value) => value.is_some(),
            Err(e @ (PersistError::Crypto(_) | PersistError::Json(_))) => {
                warn!(key = %self.key, error = %e, "unreadable secure value; removing it");
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "secure clear failed");
                return Err(e);
            }
        };
        if !present {
            info!(key = %self.key, "nothing stored; clear skipped");
            return Ok(ClearOutcome::NothingStored);
        }
        self.backend
            .delete_item(&self.key)
            .await
            .inspect_err(|e| warn!(key = %self.key, error = %e, "secure clear failed"))?;
        info!(key = %self.key, "secure value cleared");
        Ok(ClearOutcome::Cleared)
    }
}

/// Presentation state of the secure screen.
#[derive(Debug, Default, Clone)]
pub struct SecureView {
    /// Text currently typed in the input.
    pub draft: String,
    /// Echo of the last value saved from this view.
    pub last_saved: Option<String>,
    /// Value shown after the last load.
    pub stored: Option<String>,
    pub reveal: bool,
}

impl SecureView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save(&mut self, store: &SecureValueStore) -> Result<(), PersistError> {
        store.save(&self.draft).await?;
        self.last_saved = Some(self.draft.clone());
        Ok(())
    }

    /// Returns whether anything was stored.
    pub async fn load(&mut self, store: &SecureValueStore) -> Result<bool, PersistError> {
        self.stored = store.load().await?;
        Ok(self.stored.is_some())
    }

    pub async fn clear(&mut self, store: &SecureValueStore) -> Result<ClearOutcome, PersistError> {
        let outcome = store.clear().await?;
        self.stored = None;
        Ok(outcome)
    }

    pub fn toggle_reveal(&mut self) -> bool {
        self.reveal = !self.reveal;
        self.reveal
    }

    /// Stored value as it should be displayed: masked unless revealed.
    pub fn display(&self) -> Option<String> {
        self.stored.as_ref().map(|v| {
            if self.reveal {
                v.clone()
            } else {
                mask(v)
            }
        })
    }

    pub fn snapshot(&self) -> SecureSnapshot {
        SecureSnapshot {
            stored: self.display(),
            has_stored: self.stored.is_some(),
            last_saved: self.last_saved.clone(),
            reveal: self.reveal,
        }
    }
}

/// One bullet per character.
pub fn mask(value: &str) -> String {
    "•".repeat(value.chars().count())
}

#[derive(Debug, Clone, Serialize)]
pub struct SecureSnapshot {
    pub stored: Option<String>,
    pub has_stored: bool,
    pub last_saved: Option<String>,
    pub reveal: bool,
}
