//! Inbound install-event queue
//!
//! The host OS delivers install/update/uninstall broadcasts at its own
//! cadence; the registry consumes them as typed events through one queue so
//! same-package events are processed in delivery order.

use tokio::sync::mpsc;

use super::InstalledCatalog;

/// Typed install notification delivered by the host bridge.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// A newly installed package finished loading.
    Installed(InstalledCatalog),
    /// An installed package was replaced by a newer version.
    Updated(InstalledCatalog),
    /// A package was removed from the host.
    Uninstalled(String),
}

/// Sending half handed to the host's broadcast receiver.
pub type InstallEventSender = mpsc::UnboundedSender<InstallEvent>;

pub(crate) type InstallEventReceiver = mpsc::UnboundedReceiver<InstallEvent>;
