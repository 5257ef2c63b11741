//! Per-extension preference storage
//!
//! Each package gets its own JSON file under `<config>/prefs/`, so an
//! extension can never read another extension's keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;

/// Isolated key/value store handed to one extension via `Dependencies`.
#[derive(Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl PreferenceStore {
    /// Open the store for one package, reading any previously saved values.
    pub fn open(prefs_dir: &Path, pkg_name: &str) -> Result<Self> {
        let path = prefs_dir.join(format!("{}.json", pkg_name));
        let values = if path.exists() {
            let raw = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: Arc::new(RwLock::new(values)),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Set a key and persist the whole store. The lock is held across the
    /// write so concurrent mutations cannot persist out of order.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    /// Remove a key and persist the whole store.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write();
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(&values)
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(values).context("failed to serialize preferences")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}
