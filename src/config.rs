use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PersistError;

/// Environment prefix, e.g. `POCKET_DATABASE_URL`.
pub const ENV_PREFIX: &str = "POCKET_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureBackendKind {
    /// Encrypted files under `secure_store_dir`.
    File,
    /// Process memory only.
    Memory,
    /// OS credential store; needs the `keyring-store` feature.
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// sqlx connection string; the file is created when missing.
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub secure_backend: SecureBackendKind,
    /// Directory holding the encrypted slot files.
    pub secure_store_dir: PathBuf,
    /// Hex-encoded 32-byte key. When absent a key file inside
    /// `secure_store_dir` is used, created on first start.
    #[serde(default)]
    pub secure_store_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:peopledb.db".to_string(),
            listen_addr: "127.0.0.1:8000".to_string(),
            loglevel: "info".to_string(),
            secure_backend: SecureBackendKind::File,
            secure_store_dir: PathBuf::from("secure-store"),
            secure_store_key: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with `POCKET_*` environment variables.
    pub fn load() -> Result<Self, PersistError> {
        Ok(Self::figment().extract()?)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }
}
