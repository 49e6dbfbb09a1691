//! Single-slot secret storage.
//!
//! Backends speak the `set_item`/`get_item`/`delete_item` contract of a
//! platform secret store; [`SecureValueStore`] pins one fixed key on top.

pub mod cipher;
pub mod file;
#[cfg(feature = "keyring-store")]
pub mod keychain;
pub mod memory;
pub mod store;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, SecureBackendKind};
use crate::error::PersistError;

pub use file::EncryptedFileBackend;
#[cfg(feature = "keyring-store")]
pub use keychain::KeyringBackend;
pub use memory::MemoryBackend;
pub use store::{ClearOutcome, SECURE_KEY, SecureValueStore, SecureView};

#[async_trait]
pub trait SecureBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), PersistError>;
    /// `None` when nothing is stored, as opposed to an empty string.
    async fn get_item(&self, key: &str) -> Result<Option<String>, PersistError>;
    /// Removing a missing key is not an error.
    async fn delete_item(&self, key: &str) -> Result<(), PersistError>;
}

/// Keys are non-empty and limited to ASCII alphanumerics, `.`, `-` and `_`.
pub fn validate_key(key: &str) -> Result<(), PersistError> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
        && key != "."
        && key != "..";
    if ok {
        Ok(())
    } else {
        Err(PersistError::InvalidKey(key.to_string()))
    }
}

/// Build the backend selected in the configuration.
pub fn backend_from_config(cfg: &Config) -> Result<Arc<dyn SecureBackend>, PersistError> {
    match cfg.secure_backend {
        SecureBackendKind::File => Ok(Arc::new(EncryptedFileBackend::open_with_key_source(
            &cfg.secure_store_dir,
            cfg.secure_store_key.as_deref(),
        )?)),
        SecureBackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        #[cfg(feature = "keyring-store")]
        SecureBackendKind::Keyring => Ok(Arc::new(KeyringBackend::default())),
        #[cfg(not(feature = "keyring-store"))]
        SecureBackendKind::Keyring => Err(PersistError::SecureStore(
            "keyring backend requires the `keyring-store` feature".to_string(),
        )),
    }
}
