//! Installed-package discovery

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use crate::constants;

/// Ephemeral description of one installed extension package. Rebuilt on
/// every scan; never persisted.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub pkg_name: String,
    pub display_name: String,
    pub version_name: String,
    pub version_code: i64,
    /// Capability flags the package declares.
    pub features: Vec<String>,
    /// Entry-point name; a leading `.` is shorthand relative to the package.
    pub entry_point: String,
    /// DER-encoded signing certificates, first one authoritative.
    pub certificates: Vec<Vec<u8>>,
    /// Loadable library shipped in the package bundle.
    pub library_path: PathBuf,
}

impl PackageDescriptor {
    /// Whether the package declares the extension capability flag.
    pub fn declares_capability(&self) -> bool {
        self.features.iter().any(|f| f == constants::CAPABILITY_FLAG)
    }

    /// Entry point with the `.`-shorthand expanded against the package name.
    pub fn resolved_entry_point(&self) -> String {
        match self.entry_point.strip_prefix('.') {
            Some(rest) => format!("{}.{}", self.pkg_name, rest),
            None => self.entry_point.clone(),
        }
    }
}

/// Where installed packages come from: the host package registry in
/// production, a fixture in tests. Implementations filter on the capability
/// flag so the loader only ever sees candidate extensions.
#[async_trait]
pub trait PackageProvider: Send + Sync {
    /// All installed packages declaring the extension capability.
    async fn installed_packages(&self) -> Result<Vec<PackageDescriptor>>;
}

/// On-disk manifest at the root of an extension bundle.
#[derive(Debug, Deserialize)]
struct ExtensionManifest {
    pkg: String,
    name: String,
    version: String,
    code: i64,
    #[serde(default)]
    features: Vec<String>,
    entry_point: String,
    /// Base64-encoded DER signing certificate(s).
    #[serde(default)]
    certificates: Vec<String>,
    /// Library file name relative to the bundle directory.
    library: String,
}

/// Production provider scanning `<extensions>/<pkg>/extension.toml` bundles.
pub struct DirPackageProvider {
    root: PathBuf,
}

impl DirPackageProvider {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    async fn read_bundle(&self, dir: &Path) -> Result<PackageDescriptor> {
        let manifest_path = dir.join("extension.toml");
        let raw = fs::read_to_string(&manifest_path)
            .await
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: ExtensionManifest = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        let mut certificates = Vec::with_capacity(manifest.certificates.len());
        for encoded in &manifest.certificates {
            let der = BASE64
                .decode(encoded)
                .context("invalid certificate encoding (expected base64)")?;
            certificates.push(der);
        }

        Ok(PackageDescriptor {
            pkg_name: manifest.pkg,
            display_name: manifest.name,
            version_name: manifest.version,
            version_code: manifest.code,
            features: manifest.features,
            entry_point: manifest.entry_point,
            certificates,
            library_path: dir.join(&manifest.library),
        })
    }
}

#[async_trait]
impl PackageProvider for DirPackageProvider {
    async fn installed_packages(&self) -> Result<Vec<PackageDescriptor>> {
        let mut packages = Vec::new();
        if !self.root.exists() {
            return Ok(packages);
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("failed to scan {}", self.root.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match self.read_bundle(&path).await {
                Ok(descriptor) => {
                    if descriptor.declares_capability() {
                        packages.push(descriptor);
                    }
                }
                Err(err) => {
                    warn!(
                        "Skipping malformed extension bundle {}: {}",
                        path.display(),
                        err
                    );
                }
            }
        }

        Ok(packages)
    }
}
