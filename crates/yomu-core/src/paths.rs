//! Centralized path utilities
//!
//! All subsystem paths in one place for consistency

use std::path::PathBuf;

/// Get the yomu config directory (~/.yomu)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yomu")
}

/// Get the installed extension bundles directory (~/.yomu/extensions)
pub fn extensions_dir() -> PathBuf {
    config_dir().join("extensions")
}

/// Get the per-extension preference stores directory (~/.yomu/prefs)
pub fn prefs_dir() -> PathBuf {
    config_dir().join("prefs")
}

/// Get the persisted trust grants file (~/.yomu/trust.toml)
pub fn trust_file() -> PathBuf {
    config_dir().join("trust.toml")
}

/// Get the remote catalog cache database (~/.yomu/catalogs.db)
pub fn catalog_db() -> PathBuf {
    config_dir().join("catalogs.db")
}
