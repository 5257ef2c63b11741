//! Installer collaborator contract
//!
//! Package download/install/uninstall mechanics live in the host; the
//! subsystem only consumes this contract and the progress stream it emits.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use super::RemoteCatalog;

/// Progress of one package installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStep {
    Pending,
    /// Download progress, 0..=100.
    Downloading(u8),
    Installing,
    Success,
    Error(String),
}

impl InstallStep {
    /// Whether the stream ends after this step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallStep::Success | InstallStep::Error(_))
    }
}

/// Performs package download, installation, and removal.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Download and install a remote catalog, emitting progress until a
    /// terminal step.
    fn download(&self, catalog: &RemoteCatalog) -> BoxStream<'static, InstallStep>;

    /// Remove an installed package.
    async fn uninstall(&self, pkg_name: &str) -> Result<()>;
}
