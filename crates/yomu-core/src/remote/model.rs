//! Wire model of the published extension index

use serde::{Deserialize, Serialize};

use crate::constants;

/// One element of the remote index JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCatalogEntry {
    pub name: String,
    pub pkg: String,
    pub version: String,
    pub code: i64,
    pub lang: String,
    /// Archive file name relative to the repository's apk directory.
    pub apk: String,
    /// Source id of the catalog the package produces.
    pub id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nsfw: bool,
}

impl RemoteCatalogEntry {
    /// Absolute download URL for the package archive.
    pub fn apk_url(&self) -> String {
        format!("{}/apk/{}", constants::REPO_BASE_URL, self.apk)
    }

    /// Absolute icon URL; icons sit next to the archives with a `.png`
    /// extension.
    pub fn icon_url(&self) -> String {
        format!(
            "{}/icon/{}",
            constants::REPO_BASE_URL,
            self.apk.replace(".apk", ".png")
        )
    }
}
