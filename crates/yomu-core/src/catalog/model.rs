//! Catalog model
//!
//! The registry-facing wrapper around sources: bundled (`Internal`), backed
//! by a loaded package (`Installed`), or advertised by the remote index
//! (`Remote`). Identity is the package name for installed/remote catalogs
//! and the source id for internal ones.

use std::fmt;
use std::sync::Arc;

use crate::remote::RemoteCatalogEntry;
use crate::source::Source;

/// Bundled source shipped inside the host itself. No package metadata.
#[derive(Clone)]
pub struct InternalCatalog {
    pub name: String,
    pub source: Arc<dyn Source>,
}

impl fmt::Debug for InternalCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalCatalog")
            .field("name", &self.name)
            .field("source_id", &self.source.id())
            .finish()
    }
}

/// Catalog backed by a loaded extension package.
#[derive(Clone)]
pub struct InstalledCatalog {
    /// Display name, branding prefix already stripped.
    pub name: String,
    pub pkg_name: String,
    pub version_name: String,
    pub version_code: i64,
    /// Derived language tag: "", one language, or "all".
    pub lang: String,
    /// Whether the remote index advertises a newer version code.
    pub has_update: bool,
    pub sources: Vec<Arc<dyn Source>>,
}

impl fmt::Debug for InstalledCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledCatalog")
            .field("name", &self.name)
            .field("pkg_name", &self.pkg_name)
            .field("version_name", &self.version_name)
            .field("version_code", &self.version_code)
            .field("lang", &self.lang)
            .field("has_update", &self.has_update)
            .field(
                "source_ids",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Catalog advertised by the remote index, installed locally or not.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCatalog {
    pub name: String,
    pub pkg_name: String,
    pub version_name: String,
    pub version_code: i64,
    pub lang: String,
    pub nsfw: bool,
    pub source_id: i64,
    pub description: String,
    pub apk_url: String,
    pub icon_url: String,
}

impl From<RemoteCatalogEntry> for RemoteCatalog {
    fn from(entry: RemoteCatalogEntry) -> Self {
        Self {
            apk_url: entry.apk_url(),
            icon_url: entry.icon_url(),
            name: entry.name,
            pkg_name: entry.pkg,
            version_name: entry.version,
            version_code: entry.code,
            lang: entry.lang,
            nsfw: entry.nsfw,
            source_id: entry.id,
            description: entry.description,
        }
    }
}

/// Any catalog variant.
#[derive(Debug, Clone)]
pub enum Catalog {
    Internal(InternalCatalog),
    Installed(InstalledCatalog),
    Remote(RemoteCatalog),
}

impl Catalog {
    /// Identity key: package name for installed/remote, source id for
    /// internal catalogs.
    pub fn key(&self) -> String {
        match self {
            Catalog::Internal(catalog) => catalog.source.id().to_string(),
            Catalog::Installed(catalog) => catalog.pkg_name.clone(),
            Catalog::Remote(catalog) => catalog.pkg_name.clone(),
        }
    }

    /// Display name of any variant.
    pub fn name(&self) -> &str {
        match self {
            Catalog::Internal(catalog) => &catalog.name,
            Catalog::Installed(catalog) => &catalog.name,
            Catalog::Remote(catalog) => &catalog.name,
        }
    }
}
