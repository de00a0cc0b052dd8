//! Key-value preference storage.
//!
//! Preferences live in a flat JSON object on disk. When no config directory
//! can be found the app falls back to an in-memory store, so nothing survives
//! a restart but nothing fails either.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences stored as a JSON object in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chat-tui").join("preferences.json"))
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)?;
        Ok(entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking every future write
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Process-lifetime store used when persistence is unavailable
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The on-disk store if a config directory exists, memory otherwise
pub fn open_default(persist: bool) -> Box<dyn KeyValueStore> {
    if !persist {
        tracing::info!("Preference persistence disabled, using in-memory store");
        return Box::new(MemoryStore::new());
    }

    match JsonFileStore::default_path() {
        Ok(path) => {
            tracing::debug!("Preferences file: {}", path.display());
            Box::new(JsonFileStore::at(path))
        }
        Err(e) => {
            tracing::warn!("Falling back to in-memory preferences: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}
