//! Code-signing trust store

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct TrustFile {
    #[serde(default)]
    fingerprints: BTreeSet<String>,
}

/// Set of signing fingerprints permitted to execute: built-in constants
/// unioned with user grants persisted to `trust.toml`.
///
/// Additive only. There is no revocation path; untrusting would require
/// unloading live extension code mid-session.
pub struct TrustStore {
    path: PathBuf,
    granted: RwLock<BTreeSet<String>>,
}

impl TrustStore {
    /// Load the persisted trust set, starting empty if the file is absent.
    pub fn load(path: PathBuf) -> Result<Self> {
        let granted = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file: TrustFile = toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            file.fingerprints
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path,
            granted: RwLock::new(granted),
        })
    }

    /// Whether a fingerprint may execute.
    pub fn is_trusted(&self, fingerprint: &str) -> bool {
        constants::BUILTIN_TRUSTED_FINGERPRINTS
            .iter()
            .any(|fp| *fp == fingerprint)
            || self.granted.read().contains(fingerprint)
    }

    /// Grant trust to a fingerprint and persist the set. The lock is held
    /// across the write so concurrent grants cannot persist out of order.
    pub fn trust(&self, fingerprint: &str) -> Result<()> {
        let mut granted = self.granted.write();
        if !granted.insert(fingerprint.to_string()) {
            return Ok(());
        }
        self.save(&granted)
    }

    fn save(&self, fingerprints: &BTreeSet<String>) -> Result<()> {
        let file = TrustFile {
            fingerprints: fingerprints.clone(),
        };
        let content = toml::to_string_pretty(&file).context("failed to serialize trust file")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}
