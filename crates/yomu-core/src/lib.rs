//! Yomu extension catalog subsystem
//!
//! Discovery of installed extension packages, signature-based trust
//! evaluation, isolated loading into the uniform [`source::Source`]
//! abstraction, and a live registry reconciling installed extensions
//! against the published index.
//!
//! Hosts wire it together roughly like this: build a [`loader::TrustStore`]
//! and [`loader::PluginLoader`], hand both to a [`catalog::CatalogRegistry`]
//! together with a [`remote::RemoteCatalogClient`], spawn `initialize()` on
//! a background worker, and feed OS install broadcasts into the registry's
//! event sender.

pub mod catalog;
pub mod constants;
pub mod loader;
pub mod paths;
pub mod prefs;
pub mod remote;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;
