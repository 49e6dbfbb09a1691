use base64::{Engine as _, engine::general_purpose};
use chacha20poly1305::aead::{Aead, KeyInit, OsRng, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::PersistError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const ENVELOPE_VERSION: u8 = 1;

/// 32-byte slot encryption key, wiped on drop.
#[derive(Clone)]
pub struct SlotKey(Zeroizing<[u8; KEY_LEN]>);

impl SlotKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        Self(key)
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, PersistError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| PersistError::Crypto(format!("decode key: {e}")))?,
        );
        let arr: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            PersistError::Crypto(format!("key must be {KEY_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(Zeroizing::new(arr)))
    }

    /// Read the hex key stored at `path`, creating it with a fresh key when absent.
    pub fn load_or_create(path: &Path) -> Result<Self, PersistError> {
        match fs::read_to_string(path) {
            Ok(hex_key) => Self::from_hex(&hex_key),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let key = Self::generate();
                let encoded = Zeroizing::new(hex::encode(&key.0[..]));
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                fs::create_dir_all(dir)?;
                let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
                tmp.write_all(encoded.as_bytes())?;
                restrict_permissions(tmp.path())?;
                tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
                Ok(key)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0[..]))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), PersistError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), PersistError> {
    Ok(())
}

/// On-disk form of one sealed slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedSlot {
    pub version: u8,
    pub nonce: String,
    pub ciphertext: String,
}

/// Encrypt `plaintext`, binding it to `slot` so it cannot be moved to another key.
pub fn seal(key: &SlotKey, slot: &str, plaintext: &[u8]) -> Result<SealedSlot, PersistError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = key
        .cipher()
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: slot.as_bytes(),
            },
        )
        .map_err(|e| PersistError::Crypto(format!("encrypt: {e}")))?;
    Ok(SealedSlot {
        version: ENVELOPE_VERSION,
        nonce: general_purpose::STANDARD.encode(nonce),
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
    })
}

pub fn open(
    key: &SlotKey,
    slot: &str,
    sealed: &SealedSlot,
) -> Result<Zeroizing<Vec<u8>>, PersistError> {
    if sealed.version != ENVELOPE_VERSION {
        return Err(PersistError::Crypto(format!(
            "unsupported envelope version {}",
            sealed.version
        )));
    }
    let nonce = general_purpose::STANDARD
        .decode(&sealed.nonce)
        .map_err(|e| PersistError::Crypto(format!("decode nonce: {e}")))?;
    if nonce.len() != NONCE_LEN {
        return Err(PersistError::Crypto("bad nonce length".to_string()));
    }
    let ciphertext = general_purpose::STANDARD
        .decode(&sealed.ciphertext)
        .map_err(|e| PersistError::Crypto(format!("decode ciphertext: {e}")))?;
    let plaintext = key
        .cipher()
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad: slot.as_bytes(),
            },
        )
        .map_err(|e| PersistError::Crypto(format!("decrypt: {e}")))?;
    Ok(Zeroizing::new(plaintext))
}
