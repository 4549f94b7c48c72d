//! Key/scope cache collaborator used to persist bridge state across
//! invocations.
//!
//! The tweet bridge stores its credential slots (`refresh`, `api_key`,
//! `guest_token`) here. Access is read-then-write without transactional
//! guarantees; concurrent processes can race on individual slots and callers
//! are expected to treat any malformed or stale read as "must renew".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tidings_common::{BridgeError, Result};
use tokio::sync::Mutex;

/// Cache collaborator contract: `load(scope, key)` / `save(scope, key, value)`.
///
/// Scopes isolate bridges from each other; keys are slot names within a
/// scope. A missing slot loads as `None`, never as an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>>;
    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()>;
}

/// In-memory store for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>> {
        let slots = self.slots.lock().await;
        Ok(slots.get(&(scope.to_string(), key.to_string())).cloned())
    }

    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.insert((scope.to_string(), key.to_string()), value);
        Ok(())
    }
}

/// File-backed store: one JSON document per scope under a directory.
///
/// Unreadable or corrupt scope files are treated as empty rather than fatal —
/// every slot a bridge keeps here can be re-derived.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the shared data directory (`~/.local/share/tidings/cache`).
    pub fn default_location() -> Self {
        Self::new(tidings_common::observability::default_data_dir("tidings").join("cache"))
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        // Slot scopes are bridge names; keep the file name predictable.
        let safe: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn read_scope(path: &Path) -> HashMap<String, Value> {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "cache.scope_corrupt");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        }
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>> {
        let path = self.scope_path(scope);
        let slots = Self::read_scope(&path);
        tracing::debug!(scope, key, hit = slots.contains_key(key), "cache.load");
        Ok(slots.get(key).cloned())
    }

    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| BridgeError::Cache(format!("create {}: {e}", self.dir.display())))?;
        let path = self.scope_path(scope);
        let mut slots = Self::read_scope(&path);
        slots.insert(key.to_string(), value);
        let bytes = serde_json::to_vec_pretty(&slots)
            .map_err(|e| BridgeError::Cache(format!("encode {scope}: {e}")))?;
        std::fs::write(&path, bytes)
            .map_err(|e| BridgeError::Cache(format!("write {}: {e}", path.display())))?;
        tracing::debug!(scope, key, "cache.save");
        Ok(())
    }
}
