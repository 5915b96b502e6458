//! Durable storage for the session token.
//!
//! The token survives restarts in one of three places: a JSON file in the
//! cache directory, the OS keychain (see [`super::credentials`]), or memory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credentials::KeyringTokenStorage;
use crate::config::TokenBackend;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Where the session token is persisted.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, token: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Open the storage selected in the configuration.
pub fn open_token_storage(backend: TokenBackend, cache_dir: PathBuf) -> Box<dyn TokenStorage> {
    match backend {
        TokenBackend::File => Box::new(FileTokenStorage::new(cache_dir)),
        TokenBackend::Keyring => Box::new(KeyringTokenStorage),
        TokenBackend::Memory => Box::new(MemoryTokenStorage::default()),
    }
}

impl<T: TokenStorage + ?Sized> TokenStorage for Box<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn store(&self, token: &str) -> Result<()> {
        (**self).store(token)
    }

    fn remove(&self) -> Result<()> {
        (**self).remove()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Token kept in `session.json` under the cache directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    cache_dir: PathBuf,
}

impl FileTokenStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionFile =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data.token))
    }

    fn store(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let data = SessionFile {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to delete session file")?;
        }
        Ok(())
    }
}

/// In-process token storage. Clones share the same slot, which lets a
/// second [`super::SessionStore`] observe what the first persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    slot: Arc<Mutex<Option<String>>>,
    removals: Arc<AtomicUsize>,
}

impl MemoryTokenStorage {
    /// Seed the slot as if a previous run had persisted `token`.
    pub fn preload(&self, token: &str) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    /// Counter of `remove` calls
    pub fn removals(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.removals)
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
