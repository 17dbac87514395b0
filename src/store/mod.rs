//! Credential persistence.
//!
//! The orchestrator never touches storage directly; it is handed a
//! [`CredentialStore`] capability. The store holds keypair records keyed by
//! `(network_id, name)` — both the fixed service-operator key and each
//! created account's key — plus a single opaque session record whose
//! presence means "signed in".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pow::PublicKey;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt credential record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("credential store lock poisoned")]
    Lock,
}

/// A persisted keypair record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub public_key: PublicKey,
    /// Recoverable seed representation of the secret half.
    pub seed_phrase: String,
}

/// The signed-in session: one opaque record under a fixed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: String,
    pub seed_phrase: String,
}

/// Injected persistence capability.
pub trait CredentialStore: Send + Sync {
    fn get_key(&self, network_id: &str, name: &str) -> Result<Option<StoredKey>, StoreError>;
    fn set_key(&self, network_id: &str, name: &str, key: &StoredKey) -> Result<(), StoreError>;
    fn remove_key(&self, network_id: &str, name: &str) -> Result<(), StoreError>;

    fn load_session(&self) -> Result<Option<Session>, StoreError>;
    fn save_session(&self, session: &Session) -> Result<(), StoreError>;
    fn clear_session(&self) -> Result<(), StoreError>;
}

/// In-memory store, for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryCredentialStore {
    keys: RwLock<HashMap<(String, String), StoredKey>>,
    session: RwLock<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_key(&self, network_id: &str, name: &str) -> Result<Option<StoredKey>, StoreError> {
        let keys = self.keys.read().map_err(|_| StoreError::Lock)?;
        Ok(keys.get(&(network_id.to_string(), name.to_string())).cloned())
    }

    fn set_key(&self, network_id: &str, name: &str, key: &StoredKey) -> Result<(), StoreError> {
        let mut keys = self.keys.write().map_err(|_| StoreError::Lock)?;
        keys.insert((network_id.to_string(), name.to_string()), key.clone());
        Ok(())
    }

    fn remove_key(&self, network_id: &str, name: &str) -> Result<(), StoreError> {
        let mut keys = self.keys.write().map_err(|_| StoreError::Lock)?;
        keys.remove(&(network_id.to_string(), name.to_string()));
        Ok(())
    }

    fn load_session(&self) -> Result<Option<Session>, StoreError> {
        let session = self.session.read().map_err(|_| StoreError::Lock)?;
        Ok(session.clone())
    }

    fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut slot = self.session.write().map_err(|_| StoreError::Lock)?;
        *slot = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        let mut slot = self.session.write().map_err(|_| StoreError::Lock)?;
        *slot = None;
        Ok(())
    }
}

/// JSON-file store under a directory: `keys/<network>/<name>.json` plus a
/// top-level `session.json`.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.pow-faucet`, falling back to the current directory.
    pub fn default_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".pow-faucet")
    }

    fn key_path(&self, network_id: &str, name: &str) -> PathBuf {
        self.dir
            .join("keys")
            .join(network_id)
            .join(format!("{name}.json"))
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join("session.json")
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<(), StoreError> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_key(&self, network_id: &str, name: &str) -> Result<Option<StoredKey>, StoreError> {
        Self::read_json(&self.key_path(network_id, name))
    }

    fn set_key(&self, network_id: &str, name: &str, key: &StoredKey) -> Result<(), StoreError> {
        Self::write_json(&self.key_path(network_id, name), key)
    }

    fn remove_key(&self, network_id: &str, name: &str) -> Result<(), StoreError> {
        Self::remove(&self.key_path(network_id, name))
    }

    fn load_session(&self) -> Result<Option<Session>, StoreError> {
        Self::read_json(&self.session_path())
    }

    fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        Self::write_json(&self.session_path(), session)
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        Self::remove(&self.session_path())
    }
}
