//! Remote extension index
//!
//! Fetching, parsing, and caching of the published catalog manifest.

mod cache;
mod client;
mod fetcher;
mod model;

pub use cache::RemoteCatalogCache;
pub use client::RemoteCatalogClient;
pub use fetcher::{CatalogFetcher, HttpCatalogFetcher};
pub use model::RemoteCatalogEntry;
