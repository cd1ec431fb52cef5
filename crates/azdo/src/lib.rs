//! Remote project-management client library.
//!
//! Provides the [`client::RemoteResourceClient`] capability trait, a
//! reqwest-backed Azure DevOps adapter, an async operation poller, and an
//! idempotent create-or-get resolver built on top of the trait.

pub mod api;
pub mod client;
pub mod config;
pub mod poller;
pub mod resolver;

// When the `test-helpers` feature is enabled, include the in-memory remote.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
