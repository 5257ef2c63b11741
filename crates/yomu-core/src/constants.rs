//! Shared constants for the extension subsystem.

use std::time::Duration;

/// Inclusive lower bound of extension library major versions this host loads.
pub const LIB_VERSION_MIN: u32 = 2;

/// Inclusive upper bound of extension library major versions this host loads.
pub const LIB_VERSION_MAX: u32 = 2;

/// Capability flag an installed package must declare to be considered an
/// extension at all.
pub const CAPABILITY_FLAG: &str = "yomu.extension";

/// Display-name prefix stripped from extension names before they reach the UI.
pub const BRANDING_PREFIX: &str = "Yomu: ";

/// Language tag used when an extension bundles sources in several languages.
pub const MULTI_LANG: &str = "all";

/// Base URL of the published extension repository.
pub const REPO_BASE_URL: &str = "https://raw.githubusercontent.com/yomu-app/extensions/repo";

/// Minimum interval between non-forced remote index refreshes.
pub const REFRESH_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Upper bound on packages loading concurrently during a discovery batch.
pub const LOAD_CONCURRENCY: usize = 4;

/// Code-signing fingerprints trusted out of the box (hex sha256 of the
/// signing certificate). User grants are unioned with these.
pub const BUILTIN_TRUSTED_FINGERPRINTS: &[&str] = &[
    // yomu-app release certificate
    "7ce04de7a6260ac27daa5a80b2e85db49ed4f5ca11e4a76e970f4d2e6db1b0ae",
];
