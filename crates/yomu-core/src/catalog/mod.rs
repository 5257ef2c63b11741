//! Catalog subsystem
//!
//! Startup discovery of installed extensions, install/update/uninstall
//! reconciliation, and the reactive snapshots the rest of the app reads.

mod events;
mod installer;
mod model;
mod registry;

pub use events::{InstallEvent, InstallEventSender};
pub use installer::{InstallStep, Installer};
pub use model::{Catalog, InstalledCatalog, InternalCatalog, RemoteCatalog};
pub use registry::{CatalogRegistry, Snapshot};
