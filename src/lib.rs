//! branchdb - a document-access facade over a hierarchical realtime
//! key-value store.
//!
//! Entries in the backing tree are normalized into uniform [`Document`]
//! records: a field/value mapping plus an identifier (store-generated push id
//! or caller-supplied) and managed `createdAt`/`updatedAt` timestamps.
//! [`DocStore`] is the facade; the store behind it is any [`StoreBackend`]:
//!
//! - [`RtdbBackend`]: the live store, one HTTPS round-trip per operation
//!   (feature `live`, on by default)
//! - [`MemoryBackend`]: in-memory tree with the same query semantics, for
//!   tests and local development
//! - [`NoopBackend`]: disconnected stand-in substituted when configuration
//!   is absent
//!
//! The backend is dependency-injected; nothing here is a process-wide
//! singleton. [`connect`] is the composition-root helper that wires a store
//! from environment configuration.

pub mod config;
pub mod error;
pub mod facade;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use error::StoreError;
pub use facade::DocStore;
#[cfg(feature = "live")]
pub use store::RtdbBackend;
pub use store::{MemoryBackend, NoopBackend, StoreBackend};
pub use types::{Document, FieldFilter, FilterOp, QueryOptions};

#[cfg(feature = "live")]
use std::sync::Arc;

/// Build a [`DocStore`] from environment configuration.
///
/// With complete configuration this wires the live store. When configuration
/// is missing, or the live client cannot be constructed, it substitutes the
/// no-op store and logs a warning instead of failing: the degraded store
/// answers every read with nothing and swallows every write. An application
/// deployed without credentials keeps running against empty data, which is a
/// silent-degradation hazard in production - watch the logs.
#[cfg(feature = "live")]
pub fn connect() -> DocStore {
  let Some(config) = StoreConfig::from_env() else {
    tracing::warn!("store configuration incomplete, using disconnected no-op store");
    return DocStore::new(Arc::new(NoopBackend::new()));
  };
  match RtdbBackend::new(config) {
    Ok(backend) => DocStore::new(Arc::new(backend)),
    Err(error) => {
      tracing::warn!(%error, "live store client failed to initialize, using disconnected no-op store");
      DocStore::new(Arc::new(NoopBackend::new()))
    }
  }
}
