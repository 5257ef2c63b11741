//! Live catalog registry
//!
//! Owns the three reactive snapshots (internal, installed, remote) and the
//! source registry, reconciling locally installed extensions against the
//! published index. Every mutation funnels through one writer lock; readers
//! subscribe to watch channels that replay the latest snapshot on subscribe.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::events::{InstallEvent, InstallEventReceiver, InstallEventSender};
use super::model::{InstalledCatalog, InternalCatalog, RemoteCatalog};
use crate::loader::{LoadResult, PackageProvider, PluginLoader};
use crate::remote::RemoteCatalogClient;
use crate::source::SourceRegistry;

/// Published-by-reference-swap list; readers always see a fully formed list.
pub type Snapshot<T> = Arc<Vec<T>>;

pub struct CatalogRegistry {
    loader: Arc<PluginLoader>,
    provider: Arc<dyn PackageProvider>,
    remote_client: Arc<RemoteCatalogClient>,
    sources: Arc<SourceRegistry>,

    internal_tx: watch::Sender<Snapshot<InternalCatalog>>,
    installed_tx: watch::Sender<Snapshot<InstalledCatalog>>,
    remote_tx: watch::Sender<Snapshot<RemoteCatalog>>,

    /// Serializes every read-modify-write of the snapshots. Readers never
    /// take it.
    writer: Mutex<()>,

    events_tx: InstallEventSender,
    /// Taken exactly once by the event worker.
    events_rx: Mutex<Option<InstallEventReceiver>>,
}

impl CatalogRegistry {
    pub fn new(
        loader: Arc<PluginLoader>,
        provider: Arc<dyn PackageProvider>,
        remote_client: Arc<RemoteCatalogClient>,
        sources: Arc<SourceRegistry>,
    ) -> Arc<Self> {
        let (internal_tx, _) = watch::channel(Snapshot::default());
        let (installed_tx, _) = watch::channel(Snapshot::default());
        let (remote_tx, _) = watch::channel(Snapshot::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            loader,
            provider,
            remote_client,
            sources,
            internal_tx,
            installed_tx,
            remote_tx,
            writer: Mutex::new(()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    /// Sender for the host's install/update/uninstall bridge.
    pub fn event_sender(&self) -> InstallEventSender {
        self.events_tx.clone()
    }

    pub fn source_registry(&self) -> Arc<SourceRegistry> {
        self.sources.clone()
    }

    /// Live stream of bundled catalogs: current snapshot, then every change.
    pub fn internal(&self) -> watch::Receiver<Snapshot<InternalCatalog>> {
        self.internal_tx.subscribe()
    }

    /// Live stream of installed catalogs.
    pub fn installed(&self) -> watch::Receiver<Snapshot<InstalledCatalog>> {
        self.installed_tx.subscribe()
    }

    /// Live stream of remote catalogs.
    pub fn remote(&self) -> watch::Receiver<Snapshot<RemoteCatalog>> {
        self.remote_tx.subscribe()
    }

    pub fn installed_snapshot(&self) -> Snapshot<InstalledCatalog> {
        self.installed_tx.borrow().clone()
    }

    pub fn remote_snapshot(&self) -> Snapshot<RemoteCatalog> {
        self.remote_tx.borrow().clone()
    }

    /// Startup discovery. Hosts spawn this on a background worker so it
    /// never blocks startup.
    ///
    /// Builds internal catalogs from the bundled sources, seeds the remote
    /// snapshot from the cache, batch-loads every installed package, then
    /// starts the install-event worker.
    pub async fn initialize(self: &Arc<Self>, bundled: Vec<InternalCatalog>) -> Result<()> {
        for catalog in &bundled {
            self.sources.register(catalog.source.clone(), false);
        }
        self.internal_tx.send_replace(Arc::new(bundled));

        match self.remote_client.cached() {
            Ok(cached) if !cached.is_empty() => {
                let catalogs: Vec<RemoteCatalog> =
                    cached.into_iter().map(RemoteCatalog::from).collect();
                self.remote_tx.send_replace(Arc::new(catalogs));
            }
            Ok(_) => {}
            Err(err) => warn!("Failed to read cached remote catalogs: {:#}", err),
        }

        let descriptors = self.provider.installed_packages().await?;
        let candidates = descriptors.len();
        let results = self.loader.load_all(descriptors).await;

        {
            let _writer = self.writer.lock().await;
            let mut installed = Vec::new();
            let mut untrusted = 0usize;
            let mut failed = 0usize;
            for result in results {
                match result {
                    LoadResult::Success(catalog) => {
                        for source in &catalog.sources {
                            self.sources.register(source.clone(), false);
                        }
                        installed.push(catalog);
                    }
                    LoadResult::Untrusted(descriptor) => {
                        untrusted += 1;
                        info!(
                            "Extension {} is untrusted; waiting for user approval",
                            descriptor.pkg_name
                        );
                    }
                    LoadResult::Error(message) => {
                        failed += 1;
                        warn!("Extension failed to load: {}", message);
                    }
                }
            }
            info!(
                "Loaded {}/{} installed extensions ({} untrusted, {} failed)",
                installed.len(),
                candidates,
                untrusted,
                failed
            );
            self.installed_tx.send_replace(Arc::new(installed));
        }

        self.spawn_event_worker();
        Ok(())
    }

    fn spawn_event_worker(self: &Arc<Self>) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut events_rx = match registry.events_rx.lock().await.take() {
                Some(rx) => rx,
                // Worker already running.
                None => return,
            };
            while let Some(event) = events_rx.recv().await {
                match event {
                    InstallEvent::Installed(catalog) => registry.on_installed(catalog).await,
                    InstallEvent::Updated(catalog) => registry.on_updated(catalog).await,
                    InstallEvent::Uninstalled(pkg_name) => {
                        registry.on_uninstalled(&pkg_name).await;
                    }
                }
            }
        });
    }

    /// A newly installed package finished loading. A duplicate notification
    /// for a package already present is treated as an update so no two
    /// installed entries ever share a package name.
    pub async fn on_installed(&self, catalog: InstalledCatalog) {
        let _writer = self.writer.lock().await;
        self.replace_installed(catalog);
    }

    /// An installed package was replaced by a newer version.
    pub async fn on_updated(&self, catalog: InstalledCatalog) {
        let _writer = self.writer.lock().await;
        self.replace_installed(catalog);
    }

    /// Remove any entry for the same package, unregistering its old sources
    /// before the new ones register so two sources never answer the same id.
    /// Caller holds the writer lock.
    fn replace_installed(&self, catalog: InstalledCatalog) {
        let current = self.installed_tx.borrow().clone();
        let mut next: Vec<InstalledCatalog> = Vec::with_capacity(current.len() + 1);
        for existing in current.iter() {
            if existing.pkg_name == catalog.pkg_name {
                for source in &existing.sources {
                    self.sources.unregister(source.as_ref());
                }
            } else {
                next.push(existing.clone());
            }
        }
        for source in &catalog.sources {
            self.sources.register(source.clone(), false);
        }
        next.push(catalog);
        self.installed_tx.send_replace(Arc::new(next));
    }

    /// A package was removed from the host.
    pub async fn on_uninstalled(&self, pkg_name: &str) {
        let _writer = self.writer.lock().await;
        let current = self.installed_tx.borrow().clone();
        let mut next: Vec<InstalledCatalog> = Vec::with_capacity(current.len());
        let mut removed = false;
        for existing in current.iter() {
            if !removed && existing.pkg_name == pkg_name {
                for source in &existing.sources {
                    self.sources.unregister(source.as_ref());
                }
                removed = true;
            } else {
                next.push(existing.clone());
            }
        }
        if removed {
            self.installed_tx.send_replace(Arc::new(next));
        } else {
            debug!("uninstall notification for unknown package {}", pkg_name);
        }
    }

    /// Refresh the remote snapshot and recompute update flags.
    ///
    /// Best-effort: a failed or rate-limit-skipped refresh leaves the
    /// previous snapshots untouched and never escalates to the caller.
    pub async fn refresh_remote(&self, force: bool) {
        let entries = match self.remote_client.refresh(force).await {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!("remote catalog refresh skipped by cool-down");
                return;
            }
            Err(err) => {
                warn!("Remote catalog refresh failed: {:#}", err);
                return;
            }
        };

        let remote: Snapshot<RemoteCatalog> =
            Arc::new(entries.into_iter().map(RemoteCatalog::from).collect());

        let _writer = self.writer.lock().await;
        self.remote_tx.send_replace(remote.clone());

        // Recompute update flags; only publish when a flag actually flipped
        // so downstream subscribers skip redundant notifications.
        let current = self.installed_tx.borrow().clone();
        let mut changed = false;
        let next: Vec<InstalledCatalog> = current
            .iter()
            .map(|installed| {
                let has_update = remote.iter().any(|r| {
                    r.pkg_name == installed.pkg_name && r.version_code > installed.version_code
                });
                if has_update == installed.has_update {
                    installed.clone()
                } else {
                    changed = true;
                    let mut updated = installed.clone();
                    updated.has_update = has_update;
                    updated
                }
            })
            .collect();
        if changed {
            self.installed_tx.send_replace(Arc::new(next));
        }
    }
}
