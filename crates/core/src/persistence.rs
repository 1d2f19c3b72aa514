//! Local persistence: a synchronous key-value contract and the document cache
//! built on top of it.

use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::document::ResumeDocument;
use crate::errors::{Error, Result, StorageError};

const CACHE_KEY_PREFIX: &str = "resume:";

/// The single owner of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this identity's document is cached.
    pub fn cache_key(&self) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synchronous key-value storage. `put` must be durable when it returns.
pub trait LocalStore: Send + Sync {
    fn put(&self, key: &str, json: &str) -> std::result::Result<(), StorageError>;
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;
    fn remove(&self, key: &str) -> std::result::Result<(), StorageError>;
}

/// In-process store, for tests and for editors without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn put(&self, key: &str, json: &str) -> std::result::Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

/// Write-through document cache scoped per identity.
#[derive(Clone)]
pub struct DocumentCache {
    store: Arc<dyn LocalStore>,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Serialize and store. Completes before returning.
    pub fn save(&self, identity: &IdentityKey, document: &ResumeDocument) -> Result<()> {
        let json = document.to_json().map_err(|e| {
            error!("[LocalStore] Failed to encode document for {}: {}", identity, e);
            e
        })?;
        self.store.put(&identity.cache_key(), &json)?;
        debug!("[LocalStore] Saved {} bytes for {}", json.len(), identity);
        Ok(())
    }

    /// `Ok(None)` when nothing is cached; `Err(Error::Parse)` when the entry is corrupt.
    pub fn load(&self, identity: &IdentityKey) -> Result<Option<ResumeDocument>> {
        let Some(json) = self.store.get(&identity.cache_key())? else {
            return Ok(None);
        };
        ResumeDocument::from_json(&json, "local cache")
            .map(Some)
            .map_err(Error::from)
    }

    pub fn clear(&self, identity: &IdentityKey) -> Result<()> {
        self.store.remove(&identity.cache_key())?;
        Ok(())
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache").finish_non_exhaustive()
    }
}
