//! Isolated code-loading contexts
//!
//! Resolving a string entry point and running its constructor is the one
//! place the subsystem executes arbitrary third-party code. Everything is
//! funneled through this narrow seam, and every failure mode (missing
//! symbol, erroring constructor, panic) comes back as an error the loader
//! folds into a `LoadResult`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;

use super::PackageDescriptor;
use crate::source::{Dependencies, SourceEntry};

/// Resolved constructor for one extension entry point. Boxed so contexts
/// can tie whatever keeps the code alive to the constructor itself.
pub type EntryConstructor = Box<dyn FnOnce(Dependencies) -> Result<SourceEntry> + Send>;

/// Raw symbol signature every extension library exports.
type RawEntryFn = fn(Dependencies) -> Result<SourceEntry>;

/// Resolves an entry point inside a package-scoped loading context.
///
/// Implementations must not run extension code; only `instantiate` does.
pub trait LoadContext: Send + Sync {
    fn resolve_entry(
        &self,
        descriptor: &PackageDescriptor,
        entry_point: &str,
    ) -> Result<EntryConstructor>;
}

/// Invoke a resolved constructor, converting panics into errors so one
/// misbehaving package cannot take down a discovery batch.
pub fn instantiate(constructor: EntryConstructor, deps: Dependencies) -> Result<SourceEntry> {
    match panic::catch_unwind(AssertUnwindSafe(move || constructor(deps))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            Err(anyhow!("extension constructor panicked: {}", message))
        }
    }
}

/// Production context backed by `libloading`.
///
/// Each package's library is opened once and kept alive here for as long as
/// sources produced from it may run. Visibility is one-way: the package
/// links against the host ABI, the host sees only the entry symbol.
#[derive(Default)]
pub struct NativeLoadContext {
    libraries: Mutex<HashMap<String, Arc<libloading::Library>>>,
}

impl NativeLoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a package's library handle. Only safe once nothing loaded from
    /// the package can still execute, which is the host's call to make after
    /// an uninstall.
    pub fn unload(&self, pkg_name: &str) {
        self.libraries.lock().remove(pkg_name);
    }

    fn open(&self, descriptor: &PackageDescriptor) -> Result<Arc<libloading::Library>> {
        let mut libraries = self.libraries.lock();
        if let Some(library) = libraries.get(&descriptor.pkg_name) {
            return Ok(library.clone());
        }

        // SAFETY: opening the package's own bundled library. Callers reach
        // this only after the fingerprint check, so running its init code is
        // the trust boundary the subsystem exists to gate.
        let library = unsafe { libloading::Library::new(&descriptor.library_path) }
            .with_context(|| format!("failed to open {}", descriptor.library_path.display()))?;
        let library = Arc::new(library);
        libraries.insert(descriptor.pkg_name.clone(), library.clone());
        Ok(library)
    }
}

impl LoadContext for NativeLoadContext {
    fn resolve_entry(
        &self,
        descriptor: &PackageDescriptor,
        entry_point: &str,
    ) -> Result<EntryConstructor> {
        let library = self.open(descriptor)?;
        let symbol_name = entry_point.replace('.', "_");

        // SAFETY: the symbol signature is fixed by the entry-point contract.
        // The Arc moved into the constructor keeps the library mapped for at
        // least as long as the raw fn can be called.
        let raw: RawEntryFn = unsafe {
            let symbol: libloading::Symbol<'_, RawEntryFn> =
                library.get(symbol_name.as_bytes()).with_context(|| {
                    format!(
                        "entry point '{}' not found in {}",
                        entry_point,
                        descriptor.library_path.display()
                    )
                })?;
            *symbol
        };

        Ok(Box::new(move |deps| {
            let _keep_alive = &library;
            raw(deps)
        }))
    }
}
