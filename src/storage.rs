//! Key/value persistence port.
//!
//! Values are JSON documents keyed by name. Readers go through
//! [`load_stored`], which turns every failure (missing key, corrupt JSON,
//! unreadable medium) into the caller's fallback; writers go through
//! [`save_stored`], which logs and swallows failures.

use anyhow::{Context, Result, anyhow};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub trait KeyValueStore {
  /// Raw stored value, or `None` if the key was never written.
  fn load(&self, key: &str) -> Result<Option<String>>;
  fn save(&self, key: &str, value: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore + Send + Sync>;

/// Read `key` as JSON, falling back on any failure.
pub fn load_stored<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, fallback: T) -> T {
  match store.load(key) {
    Ok(Some(raw)) if !raw.trim().is_empty() => match serde_json::from_str(&raw) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, err = %e, "storage: stored value is corrupt, using default");
        fallback
      }
    },
    Ok(_) => fallback,
    Err(e) => {
      warn!(key, err = %format!("{:#}", e), "storage: unavailable, using default");
      fallback
    }
  }
}

/// Write `value` as JSON under `key`. Best effort.
pub fn save_stored<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
  let result = serde_json::to_string(value)
    .context("Failed to serialize value")
    .and_then(|json| store.save(key, &json));
  if let Err(e) = result {
    warn!(key, err = %format!("{:#}", e), "storage: save failed");
  }
}

// --- File-backed store ---

/// One `<key>.json` file per key inside a directory.
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl KeyValueStore for FileStore {
  fn load(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key);
    match std::fs::read_to_string(&path) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
  }

  fn save(&self, key: &str, value: &str) -> Result<()> {
    std::fs::create_dir_all(&self.dir)
      .with_context(|| format!("Failed to create store directory {}", self.dir.display()))?;
    let path = self.path_for(key);
    // Write then rename so a crash never leaves a half-written document.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
  }
}

// --- In-memory store ---

#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn load(&self, key: &str) -> Result<Option<String>> {
    let entries = self.entries.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
    Ok(entries.get(key).cloned())
  }

  fn save(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self.entries.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// A medium that refuses every operation, like disabled browser storage.
#[cfg(test)]
pub struct UnavailableStore;

#[cfg(test)]
impl KeyValueStore for UnavailableStore {
  fn load(&self, _key: &str) -> Result<Option<String>> {
    Err(anyhow!("storage disabled"))
  }

  fn save(&self, _key: &str, _value: &str) -> Result<()> {
    Err(anyhow!("quota exceeded"))
  }
}
