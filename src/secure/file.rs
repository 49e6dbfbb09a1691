use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::cipher::{self, SealedSlot, SlotKey};
use super::{SecureBackend, validate_key};
use crate::error::PersistError;

pub const KEY_FILE_NAME: &str = "slot.key";
const SLOT_EXTENSION: &str = "slot";

/// One encrypted file per key inside a directory.
///
/// Writes go to a temp file that is renamed over the slot, so a reader sees
/// either the old value or the new one. Writers are serialized; the last one wins.
pub struct EncryptedFileBackend {
    dir: PathBuf,
    key: SlotKey,
    write_lock: Mutex<()>,
}

impl EncryptedFileBackend {
    pub fn open(dir: impl Into<PathBuf>, key: SlotKey) -> Result<Self, PersistError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            key,
            write_lock: Mutex::new(()),
        })
    }

    /// Use `hex_key` when given, else the key file inside `dir`.
    pub fn open_with_key_source(
        dir: impl Into<PathBuf>,
        hex_key: Option<&str>,
    ) -> Result<Self, PersistError> {
        let dir = dir.into();
        let key = match hex_key {
            Some(hex_key) => SlotKey::from_hex(hex_key)?,
            None => SlotKey::load_or_create(&dir.join(KEY_FILE_NAME))?,
        };
        Self::open(dir, key)
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{SLOT_EXTENSION}"))
    }
}

#[async_trait]
impl SecureBackend for EncryptedFileBackend {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), PersistError> {
        validate_key(key)?;
        let sealed = cipher::seal(&self.key, key, value.as_bytes())?;
        let bytes = serde_json::to_vec(&sealed)?;

        let _guard = self.write_lock.lock().await;
        let dir = self.dir.clone();
        let path = self.slot_path(key);
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &bytes))
            .await
            .map_err(|e| PersistError::SecureStore(format!("write task failed: {e}")))??;
        debug!(key, "slot written");
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, PersistError> {
        validate_key(key)?;
        let raw = match tokio::fs::read(self.slot_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let sealed: SealedSlot = serde_json::from_slice(&raw)?;
        let plain = cipher::open(&self.key, key, &sealed)?;
        let value = String::from_utf8(plain.to_vec())
            .map_err(|e| PersistError::Crypto(format!("slot is not UTF-8: {e}")))?;
        Ok(Some(value))
    }

    async fn delete_item(&self, key: &str) -> Result<(), PersistError> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.slot_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(dir: &Path) -> EncryptedFileBackend {
        EncryptedFileBackend::open_with_key_source(dir, None).expect("open backend")
    }

    #[tokio::test]
    async fn stores_ciphertext_only() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        backend.set_item("secureUserData", "my pin 1234").await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("secureUserData.slot")).unwrap();
        assert!(!on_disk.contains("my pin 1234"));
        assert_eq!(
            backend.get_item("secureUserData").await.unwrap().as_deref(),
            Some("my pin 1234")
        );
    }

    #[tokio::test]
    async fn survives_reopen_with_same_key_file() {
        let dir = tempfile::tempdir().unwrap();
        backend(dir.path()).set_item("k", "v1").await.unwrap();
        assert_eq!(backend(dir.path()).get_item("k").await.unwrap().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn overwrite_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        backend.set_item("k", "one").await.unwrap();
        backend.set_item("k", "two").await.unwrap();
        assert_eq!(backend.get_item("k").await.unwrap().as_deref(), Some("two"));

        backend.delete_item("k").await.unwrap();
        assert_eq!(backend.get_item("k").await.unwrap(), None);
        backend.delete_item("k").await.unwrap();
    }

    #[tokio::test]
    async fn foreign_key_cannot_read() {
        let dir = tempfile::tempdir().unwrap();
        backend(dir.path()).set_item("k", "secret").await.unwrap();

        let other = EncryptedFileBackend::open(dir.path(), SlotKey::generate()).unwrap();
        assert!(matches!(other.get_item("k").await, Err(PersistError::Crypto(_))));
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        assert!(matches!(
            backend.set_item("../escape", "x").await,
            Err(PersistError::InvalidKey(_))
        ));
    }
}
