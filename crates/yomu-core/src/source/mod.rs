//! Source abstraction
//!
//! Every loaded extension produces one or more `Source` objects, the uniform
//! capability surface the rest of the app talks to. Content fetching lives on
//! the source implementations themselves; this module only defines identity
//! and the entry-point contract.

mod registry;

pub use registry::SourceRegistry;

use std::fmt;
use std::sync::Arc;

use crate::prefs::PreferenceStore;

/// Uniform capability object an extension package produces.
pub trait Source: Send + Sync {
    /// Globally unique source id.
    fn id(&self) -> i64;

    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Language tag of the content this source serves ("en", "ja", ...).
    fn lang(&self) -> &str;

    /// Whether this source participates in catalog browsing. Sources that
    /// only resolve deep links opt out and are excluded from language
    /// derivation.
    fn is_catalog(&self) -> bool {
        true
    }
}

/// Entry point producing several sources from one package.
pub trait SourceFactory: Send + Sync {
    fn create_sources(&self) -> Vec<Arc<dyn Source>>;
}

/// What an extension entry point may instantiate: a single source or a
/// factory of many. Closed by design; anything else fails at the loader.
pub enum SourceEntry {
    Single(Arc<dyn Source>),
    Factory(Arc<dyn SourceFactory>),
}

impl SourceEntry {
    /// Flatten into the concrete source list.
    pub fn sources(&self) -> Vec<Arc<dyn Source>> {
        match self {
            SourceEntry::Single(source) => vec![source.clone()],
            SourceEntry::Factory(factory) => factory.create_sources(),
        }
    }
}

impl fmt::Debug for SourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEntry::Single(source) => f.debug_tuple("Single").field(&source.id()).finish(),
            SourceEntry::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}


/// Fixed dependency bundle handed to every extension constructor.
#[derive(Clone)]
pub struct Dependencies {
    /// Shared HTTP client.
    pub http: reqwest::Client,
    /// Preference store isolated to the constructing package.
    pub preferences: PreferenceStore,
}
