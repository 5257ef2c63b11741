//! Shared test fixtures: fake sources, load contexts, providers, fetchers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::constants;
use crate::loader::{EntryConstructor, LoadContext, PackageDescriptor, PackageProvider};
use crate::prefs::PreferenceStore;
use crate::remote::{CatalogFetcher, RemoteCatalogEntry};
use crate::source::{Dependencies, Source, SourceEntry, SourceFactory};

#[derive(Debug, Clone)]
pub(crate) struct FakeSource {
    id: i64,
    name: String,
    lang: String,
    catalog: bool,
}

impl FakeSource {
    pub(crate) fn new(id: i64, name: &str, lang: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            lang: lang.to_string(),
            catalog: true,
        }
    }

    pub(crate) fn non_catalog(mut self) -> Self {
        self.catalog = false;
        self
    }
}

impl Source for FakeSource {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn lang(&self) -> &str {
        &self.lang
    }

    fn is_catalog(&self) -> bool {
        self.catalog
    }
}

struct FakeFactory {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceFactory for FakeFactory {
    fn create_sources(&self) -> Vec<Arc<dyn Source>> {
        self.sources.clone()
    }
}

#[derive(Clone)]
enum FakeEntry {
    Single { id: i64, lang: String },
    Factory(Vec<FakeSource>),
    Panicking,
}

/// Load context resolving entry points from a fixed table, no real code.
#[derive(Default)]
pub(crate) struct FakeContext {
    entries: HashMap<String, FakeEntry>,
}

impl FakeContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_single(mut self, entry_point: &str, id: i64, lang: &str) -> Self {
        self.entries.insert(
            entry_point.to_string(),
            FakeEntry::Single {
                id,
                lang: lang.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_factory(mut self, entry_point: &str, sources: Vec<FakeSource>) -> Self {
        self.entries
            .insert(entry_point.to_string(), FakeEntry::Factory(sources));
        self
    }

    pub(crate) fn with_panicking(mut self, entry_point: &str) -> Self {
        self.entries
            .insert(entry_point.to_string(), FakeEntry::Panicking);
        self
    }
}

impl LoadContext for FakeContext {
    fn resolve_entry(
        &self,
        _descriptor: &PackageDescriptor,
        entry_point: &str,
    ) -> Result<EntryConstructor> {
        let entry = self
            .entries
            .get(entry_point)
            .cloned()
            .ok_or_else(|| anyhow!("entry point '{}' not found", entry_point))?;

        Ok(Box::new(move |_deps| match entry {
            FakeEntry::Single { id, lang } => Ok(SourceEntry::Single(Arc::new(FakeSource::new(
                id, "Fake", &lang,
            )))),
            FakeEntry::Factory(sources) => Ok(SourceEntry::Factory(Arc::new(FakeFactory {
                sources: sources
                    .into_iter()
                    .map(|source| Arc::new(source) as Arc<dyn Source>)
                    .collect(),
            }))),
            FakeEntry::Panicking => panic!("constructor exploded"),
        }))
    }
}

/// Descriptor with the capability flag set and a `<pkg>.Entry` entry point.
pub(crate) fn descriptor(pkg: &str, version: &str, certs: &[&[u8]]) -> PackageDescriptor {
    descriptor_with_entry(pkg, version, certs, &format!("{}.Entry", pkg))
}

pub(crate) fn descriptor_with_entry(
    pkg: &str,
    version: &str,
    certs: &[&[u8]],
    entry_point: &str,
) -> PackageDescriptor {
    PackageDescriptor {
        pkg_name: pkg.to_string(),
        display_name: pkg.to_string(),
        version_name: version.to_string(),
        version_code: 1,
        features: vec![constants::CAPABILITY_FLAG.to_string()],
        entry_point: entry_point.to_string(),
        certificates: certs.iter().map(|der| der.to_vec()).collect(),
        library_path: PathBuf::from(format!("lib{}.so", pkg)),
    }
}

pub(crate) fn dependencies() -> Dependencies {
    let preferences = PreferenceStore::open(&std::env::temp_dir(), "yomu-core-test")
        .expect("open preference store");
    Dependencies {
        http: reqwest::Client::new(),
        preferences,
    }
}

/// Package provider serving a fixed descriptor list.
pub(crate) struct FakeProvider {
    packages: Vec<PackageDescriptor>,
}

impl FakeProvider {
    pub(crate) fn new(packages: Vec<PackageDescriptor>) -> Self {
        Self { packages }
    }
}

#[async_trait]
impl PackageProvider for FakeProvider {
    async fn installed_packages(&self) -> Result<Vec<PackageDescriptor>> {
        Ok(self.packages.clone())
    }
}

/// Index fetcher with a programmable response and a call counter.
pub(crate) struct StubFetcher {
    response: Mutex<Result<Vec<RemoteCatalogEntry>, String>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn ok(entries: Vec<RemoteCatalogEntry>) -> Self {
        Self {
            response: Mutex::new(Ok(entries)),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn err(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_ok(&self, entries: Vec<RemoteCatalogEntry>) {
        *self.response.lock() = Ok(entries);
    }

    pub(crate) fn set_err(&self, message: &str) {
        *self.response.lock() = Err(message.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogFetcher for StubFetcher {
    async fn fetch_index(&self) -> Result<Vec<RemoteCatalogEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.response.lock() {
            Ok(entries) => Ok(entries.clone()),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }
}

/// Remote index entry with sensible defaults for tests.
pub(crate) fn remote_entry(pkg: &str, id: i64, code: i64) -> RemoteCatalogEntry {
    RemoteCatalogEntry {
        name: format!("Remote {}", pkg),
        pkg: pkg.to_string(),
        version: "2.9.0".to_string(),
        code,
        lang: "en".to_string(),
        apk: format!("{}.apk", pkg),
        id,
        description: String::new(),
        nsfw: false,
    }
}
