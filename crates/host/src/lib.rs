//! Backend registry for the stateplug state-store adapter.
//!
//! At startup the host reads the backend selection from the environment and
//! builds a [`Registry`] holding one uninitialized store per selected
//! backend, each exposed under its own store name:
//!
//! | Identifiers | Backend | Store name |
//! |-------------|---------|------------|
//! | `nebulagraph`, `nebula` | [`BackendKind::Nebula`] | `nebulagraph` |
//! | `cassandra`, `scylla` | [`BackendKind::Cassandra`] | `cassandra` |
//!
//! Identifiers are case-insensitive. Unknown and repeated identifiers are
//! logged and skipped; if nothing remains, [`DEFAULT_BACKEND`] is registered.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stateplug_host::{BackendKind, Connectors, Registry};
//! use stateplug_store::Connector;
//!
//! # async fn run(cql: Arc<dyn Connector>, ngql: Arc<dyn Connector>) {
//! let connectors = Connectors::new()
//!     .with(BackendKind::Cassandra, cql)
//!     .with(BackendKind::Nebula, ngql);
//! let registry = Registry::from_env(&connectors);
//! for name in registry.names() {
//!     println!("serving state store {name}");
//! }
//! # registry.close_all().await.ok();
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod registry;
mod selection;

pub use backend::{BackendKind, DEFAULT_BACKEND};
pub use registry::{Connectors, Registry};
pub use selection::{
    BACKENDS_VAR, LEGACY_BACKEND_VAR, parse_selection, raw_selection, selection_from,
    selection_from_env,
};
