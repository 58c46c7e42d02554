//! Session key persistence.
//!
//! The key is the only client state that survives a restart. It lives in a
//! single file holding the bare key; the store caches it after the first
//! read and writes through on every change.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rand::Rng;
use stockcart_types::SessionKey;
use tracing::{debug, info, warn};

use crate::error::KeyStoreError;

/// Length of generated keys.
pub const GENERATED_KEY_LEN: usize = 10;

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Durable slot for the session key.
pub trait KeyStorage: Send {
    fn load(&self) -> Result<Option<String>, KeyStoreError>;
    fn save(&mut self, key: &SessionKey) -> Result<(), KeyStoreError>;
}

/// One-line file holding the key.
#[derive(Debug, Clone)]
pub struct FileKeyStorage {
    path: PathBuf,
}

impl FileKeyStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyStorage for FileKeyStorage {
    fn load(&self) -> Result<Option<String>, KeyStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "unreadable session key file: {e}");
                Ok(None)
            }
            Err(e) => Err(KeyStoreError::io(&self.path, e)),
        }
    }

    fn save(&mut self, key: &SessionKey) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KeyStoreError::io(parent, e))?;
        }
        std::fs::write(&self.path, format!("{key}\n"))
            .map_err(|e| KeyStoreError::io(&self.path, e))
    }
}

/// In-process storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryKeyStorage {
    pub fn with_key(key: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(key.to_string()))),
        }
    }

    /// What a restart would read back.
    pub fn persisted(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl KeyStorage for MemoryKeyStorage {
    fn load(&self) -> Result<Option<String>, KeyStoreError> {
        Ok(self.persisted())
    }

    fn save(&mut self, key: &SessionKey) -> Result<(), KeyStoreError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
        Ok(())
    }
}

pub struct SessionKeyStore {
    storage: Box<dyn KeyStorage>,
    active: Option<SessionKey>,
}

impl SessionKeyStore {
    pub fn new(storage: impl KeyStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            active: None,
        }
    }

    /// The active key, loading or creating it on first use.
    pub fn get_or_create_key(&mut self) -> Result<SessionKey, KeyStoreError> {
        if let Some(key) = &self.active {
            return Ok(key.clone());
        }

        let key = match self.storage.load()? {
            Some(raw) => match SessionKey::parse(&raw) {
                Ok(key) => {
                    debug!(key = %key, "loaded session key");
                    key
                }
                Err(e) => {
                    warn!("persisted session key unusable: {e}");
                    self.create()?
                }
            },
            None => self.create()?,
        };
        self.active = Some(key.clone());
        Ok(key)
    }

    /// Replaces the active key with user input. Blank input leaves everything untouched.
    pub fn set_key(&mut self, raw: &str) -> Result<SessionKey, KeyStoreError> {
        let key = SessionKey::parse(raw)?;
        self.storage.save(&key)?;
        info!(key = %key, "session key applied");
        self.active = Some(key.clone());
        Ok(key)
    }

    pub fn regenerate_key(&mut self) -> Result<SessionKey, KeyStoreError> {
        let key = self.create()?;
        self.active = Some(key.clone());
        Ok(key)
    }

    /// Active key if one was loaded or set; never touches storage.
    pub fn active(&self) -> Option<&SessionKey> {
        self.active.as_ref()
    }

    fn create(&mut self) -> Result<SessionKey, KeyStoreError> {
        let key = generate_key();
        self.storage.save(&key)?;
        info!(key = %key, "generated new session key");
        Ok(key)
    }
}

/// Random lowercase alphanumeric key, URL-safe.
pub fn generate_key() -> SessionKey {
    let mut rng = rand::thread_rng();
    let raw: String = (0..GENERATED_KEY_LEN)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect();
    SessionKey::parse(&raw).unwrap_or_else(|_| unreachable!("generated key is never blank"))
}
