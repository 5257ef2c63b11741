//! Extension package validation and loading
//!
//! `PluginLoader` turns one installed package into a `LoadResult` without
//! touching shared state. Registering the produced sources is the catalog
//! registry's job, which keeps loading and registration independently
//! ordered.

mod context;
mod descriptor;
mod trust;

pub use context::{instantiate, EntryConstructor, LoadContext, NativeLoadContext};
pub use descriptor::{DirPackageProvider, PackageDescriptor, PackageProvider};
pub use trust::TrustStore;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::InstalledCatalog;
use crate::constants;
use crate::prefs::PreferenceStore;
use crate::source::{Dependencies, Source, SourceEntry};

/// Contract violations surfaced as `LoadResult::Error`, never thrown past
/// the loader boundary.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("package does not declare the extension capability")]
    MissingCapability,
    #[error("unsupported extension library version {0}")]
    UnsupportedVersion(u32),
    #[error("version name '{0}' has no parseable major version")]
    MalformedVersion(String),
    #[error("package is not signed")]
    Unsigned,
}

/// Outcome of one load attempt.
#[derive(Debug)]
pub enum LoadResult {
    Success(InstalledCatalog),
    /// Valid package whose signing fingerprint is not in the trust store.
    /// Surfaced separately so the host can offer an explicit trust action.
    /// No plugin code has executed.
    Untrusted(PackageDescriptor),
    Error(String),
}

/// Stateless function of its input: validates, loads, and instantiates one
/// package's sources. Carries no registry; callers decide what to do with
/// each result.
pub struct PluginLoader {
    context: Arc<dyn LoadContext>,
    trust_store: Arc<TrustStore>,
    http: reqwest::Client,
    prefs_dir: PathBuf,
}

impl PluginLoader {
    pub fn new(
        context: Arc<dyn LoadContext>,
        trust_store: Arc<TrustStore>,
        http: reqwest::Client,
        prefs_dir: PathBuf,
    ) -> Self {
        Self {
            context,
            trust_store,
            http,
            prefs_dir,
        }
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Load every candidate concurrently with a bounded worker pool. One
    /// malformed package never blocks the rest; result order is unspecified.
    ///
    /// There is no per-package timeout: a constructor that never returns
    /// stalls its own slot, not the batch.
    pub async fn load_all(&self, descriptors: Vec<PackageDescriptor>) -> Vec<LoadResult> {
        stream::iter(descriptors)
            .map(|descriptor| self.load(descriptor))
            .buffer_unordered(constants::LOAD_CONCURRENCY)
            .collect()
            .await
    }

    /// Validate and load one package.
    ///
    /// Trust is evaluated before any plugin code runs; an unrecognized
    /// fingerprint yields `Untrusted`, every contract violation `Error`.
    pub async fn load(&self, descriptor: PackageDescriptor) -> LoadResult {
        if !descriptor.declares_capability() {
            return LoadResult::Error(LoadError::MissingCapability.to_string());
        }

        match parse_major_version(&descriptor.version_name) {
            Ok(major)
                if (constants::LIB_VERSION_MIN..=constants::LIB_VERSION_MAX)
                    .contains(&major) => {}
            Ok(major) => {
                return LoadResult::Error(LoadError::UnsupportedVersion(major).to_string())
            }
            Err(err) => return LoadResult::Error(err.to_string()),
        }

        let fingerprint = match signing_fingerprint(&descriptor) {
            Some(fingerprint) => fingerprint,
            None => return LoadResult::Error(LoadError::Unsigned.to_string()),
        };
        if !self.trust_store.is_trusted(&fingerprint) {
            debug!(
                "extension {} signed by unrecognized fingerprint {}",
                descriptor.pkg_name, fingerprint
            );
            return LoadResult::Untrusted(descriptor);
        }

        match self.instantiate_catalog(&descriptor).await {
            Ok(catalog) => LoadResult::Success(catalog),
            Err(err) => {
                warn!("Failed to load extension {}: {:#}", descriptor.pkg_name, err);
                LoadResult::Error(format!("{:#}", err))
            }
        }
    }

    async fn instantiate_catalog(&self, descriptor: &PackageDescriptor) -> Result<InstalledCatalog> {
        let entry_point = descriptor.resolved_entry_point();
        let preferences = PreferenceStore::open(&self.prefs_dir, &descriptor.pkg_name)?;
        let deps = Dependencies {
            http: self.http.clone(),
            preferences,
        };

        // Library opening and the constructor itself are blocking; keep them
        // off the async workers.
        let context = self.context.clone();
        let blocking_descriptor = descriptor.clone();
        let entry = tokio::task::spawn_blocking(move || -> Result<SourceEntry> {
            let constructor = context.resolve_entry(&blocking_descriptor, &entry_point)?;
            instantiate(constructor, deps)
        })
        .await
        .context("extension load task failed")??;

        let sources = entry.sources();
        let lang = derive_lang(&sources);
        let name = descriptor
            .display_name
            .strip_prefix(constants::BRANDING_PREFIX)
            .unwrap_or(&descriptor.display_name)
            .to_string();

        Ok(InstalledCatalog {
            name,
            pkg_name: descriptor.pkg_name.clone(),
            version_name: descriptor.version_name.clone(),
            version_code: descriptor.version_code,
            lang,
            has_update: false,
            sources,
        })
    }
}

/// Major component of a dotted version name.
fn parse_major_version(version_name: &str) -> Result<u32, LoadError> {
    version_name
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| LoadError::MalformedVersion(version_name.to_string()))
}

/// Hex sha256 of the first signing certificate; `None` when unsigned.
fn signing_fingerprint(descriptor: &PackageDescriptor) -> Option<String> {
    descriptor
        .certificates
        .first()
        .map(|der| format!("{:x}", Sha256::digest(der)))
}

/// Language tag over the catalog-capable sources: empty for none, the
/// language itself for exactly one, "all" for several distinct ones.
fn derive_lang(sources: &[Arc<dyn Source>]) -> String {
    let langs: BTreeSet<&str> = sources
        .iter()
        .filter(|source| source.is_catalog())
        .map(|source| source.lang())
        .collect();

    if langs.len() > 1 {
        return constants::MULTI_LANG.to_string();
    }
    langs
        .into_iter()
        .next()
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, descriptor_with_entry, FakeContext, FakeSource};
    use tempfile::tempdir;

    fn loader_with(context: FakeContext, trusted: &[String]) -> (PluginLoader, tempfile::TempDir) {
        let temp = tempdir().expect("tempdir");
        let trust_store =
            TrustStore::load(temp.path().join("trust.toml")).expect("load trust store");
        for fingerprint in trusted {
            trust_store.trust(fingerprint).expect("grant trust");
        }
        let loader = PluginLoader::new(
            Arc::new(context),
            Arc::new(trust_store),
            reqwest::Client::new(),
            temp.path().join("prefs"),
        );
        (loader, temp)
    }

    fn fingerprint_of(der: &[u8]) -> String {
        format!("{:x}", Sha256::digest(der))
    }

    #[tokio::test]
    async fn unrecognized_fingerprint_yields_untrusted() {
        let (loader, _temp) = loader_with(FakeContext::new(), &[]);
        let descriptor = descriptor("com.example.en", "2.0.0", &[b"stranger"]);

        match loader.load(descriptor).await {
            LoadResult::Untrusted(untrusted) => {
                assert_eq!(untrusted.pkg_name, "com.example.en");
            }
            other => panic!("expected Untrusted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn version_outside_supported_range_is_an_error() {
        let cert = b"cert".as_slice();
        let (loader, _temp) = loader_with(FakeContext::new(), &[fingerprint_of(cert)]);

        for version in ["1.9.0", "3.0.0"] {
            let descriptor = descriptor("com.example.en", version, &[cert]);
            match loader.load(descriptor).await {
                LoadResult::Error(message) => {
                    assert!(message.contains("unsupported"), "got: {}", message);
                }
                other => panic!("expected Error for {}, got {:?}", version, other),
            }
        }
    }

    #[tokio::test]
    async fn malformed_version_is_an_error() {
        let cert = b"cert".as_slice();
        let (loader, _temp) = loader_with(FakeContext::new(), &[fingerprint_of(cert)]);
        let descriptor = descriptor("com.example.en", "vNext", &[cert]);

        match loader.load(descriptor).await {
            LoadResult::Error(message) => {
                assert!(message.contains("major version"), "got: {}", message);
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unsigned_package_is_an_error() {
        let (loader, _temp) = loader_with(FakeContext::new(), &[]);
        let descriptor = descriptor("com.example.en", "2.0.0", &[]);

        match loader.load(descriptor).await {
            LoadResult::Error(message) => {
                assert!(message.contains("not signed"), "got: {}", message);
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_capability_is_an_error() {
        let (loader, _temp) = loader_with(FakeContext::new(), &[]);
        let mut descriptor = descriptor("com.example.en", "2.0.0", &[b"cert"]);
        descriptor.features.clear();

        match loader.load(descriptor).await {
            LoadResult::Error(message) => {
                assert!(message.contains("capability"), "got: {}", message);
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn trusted_package_loads_with_normalized_name() {
        let cert = b"cert".as_slice();
        let context = FakeContext::new().with_single("com.example.en.Entry", 14, "en");
        let (loader, _temp) = loader_with(context, &[fingerprint_of(cert)]);

        let mut descriptor =
            descriptor_with_entry("com.example.en", "2.1.3", &[cert], "com.example.en.Entry");
        descriptor.display_name = "Yomu: Example".to_string();

        match loader.load(descriptor).await {
            LoadResult::Success(catalog) => {
                assert_eq!(catalog.name, "Example");
                assert_eq!(catalog.pkg_name, "com.example.en");
                assert_eq!(catalog.lang, "en");
                assert_eq!(catalog.sources.len(), 1);
                assert!(!catalog.has_update);
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn factory_with_multiple_languages_derives_all() {
        let cert = b"cert".as_slice();
        let context = FakeContext::new().with_factory(
            "com.example.multi.Entry",
            vec![
                FakeSource::new(1, "EN", "en"),
                FakeSource::new(2, "JA", "ja"),
            ],
        );
        let (loader, _temp) = loader_with(context, &[fingerprint_of(cert)]);
        let descriptor =
            descriptor_with_entry("com.example.multi", "2.0.0", &[cert], "com.example.multi.Entry");

        match loader.load(descriptor).await {
            LoadResult::Success(catalog) => assert_eq!(catalog.lang, constants::MULTI_LANG),
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn factory_without_catalog_sources_derives_empty_lang() {
        let cert = b"cert".as_slice();
        let context = FakeContext::new().with_factory(
            "com.example.deep.Entry",
            vec![FakeSource::new(1, "Deep", "en").non_catalog()],
        );
        let (loader, _temp) = loader_with(context, &[fingerprint_of(cert)]);
        let descriptor =
            descriptor_with_entry("com.example.deep", "2.0.0", &[cert], "com.example.deep.Entry");

        match loader.load(descriptor).await {
            LoadResult::Success(catalog) => assert_eq!(catalog.lang, ""),
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn batch_load_isolates_a_panicking_constructor() {
        let cert = b"cert".as_slice();
        let context = FakeContext::new()
            .with_single("com.example.a.Entry", 1, "en")
            .with_single("com.example.b.Entry", 2, "en")
            .with_panicking("com.example.bad.Entry");
        let (loader, _temp) = loader_with(context, &[fingerprint_of(cert)]);

        let descriptors = vec![
            descriptor_with_entry("com.example.a", "2.0.0", &[cert], "com.example.a.Entry"),
            descriptor_with_entry("com.example.bad", "2.0.0", &[cert], "com.example.bad.Entry"),
            descriptor_with_entry("com.example.b", "2.0.0", &[cert], "com.example.b.Entry"),
        ];

        let results = loader.load_all(descriptors).await;
        assert_eq!(results.len(), 3);

        let successes = results
            .iter()
            .filter(|r| matches!(r, LoadResult::Success(_)))
            .count();
        let errors = results
            .iter()
            .filter(|r| matches!(r, LoadResult::Error(_)))
            .count();
        assert_eq!(successes, 2);
        assert_eq!(errors, 1);
    }

    #[test]
    fn parse_major_version_handles_common_shapes() {
        assert_eq!(parse_major_version("2.0.1").expect("parse"), 2);
        assert_eq!(parse_major_version("2").expect("parse"), 2);
        assert!(parse_major_version("v2.0").is_err());
        assert!(parse_major_version("").is_err());
    }
}
