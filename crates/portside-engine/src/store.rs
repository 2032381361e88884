//! Persistent key-value store contract and the JSON-file adapter

use std::path::{Path, PathBuf};

use serde_json::Value;

use portside_core::prelude::*;

/// Scoped key/value persistence the engine writes its configuration through.
///
/// Writes for a given key are serialized by the engine (single owner,
/// awaited in order); implementations only need last-write-wins semantics,
/// not transactional isolation.
#[trait_variant::make(Send)]
pub trait ConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Stores all keys in a single JSON object file.
///
/// Every write rewrites the file atomically (temp file + rename), so a
/// crash mid-write never leaves a half-written store behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default store location under the user's local data directory.
    pub fn default_path() -> PathBuf {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("portside").join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::store(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, map: &serde_json::Map<String, Value>) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("state.json");
        let temp_path = parent.join(format!(".{file_name}.tmp"));

        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))?;

        // Atomic write: write to temp, then rename
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;

        trace!("Wrote {} keys to {}", map.len(), self.path.display());
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        self.write_all(&map)
    }
}
