//! NebulaGraph backend for the stateplug state-store adapter.
//!
//! Entries are stored as vertices: the vertex ID is the key and a single tag
//! (default `state`) carries the value in a `data string` property. The
//! generic [`Adapter`] provides configuration, pooling, lifecycle and bulk
//! execution; this crate contributes the [`NebulaDialect`] that spells each
//! operation in nGQL.
//!
//! # Configuration
//!
//! | Property | Required | Meaning |
//! |----------|----------|---------|
//! | `hosts` | yes | Comma-separated graphd hosts |
//! | `port` | yes | graphd port (e.g. `9669`) |
//! | `username` / `password` | yes | Session credentials |
//! | `space` | yes | Graph space; every session runs ``USE `space` `` first |
//! | `tag` | no | Tag holding the entries (default `state`) |
//! | `createSchema` | no | Create the tag and its index on init (default `false`); NebulaGraph applies both asynchronously, so writes right after init may fail for one or two heartbeat cycles |
//! | `connectTimeout` / `requestTimeout` | no | Durations such as `5s` |
//!
//! Any other property is passed through to the driver as an option.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::{collections::HashMap, sync::Arc};
//!
//! use stateplug_store::{Connector, OpContext, StateStore, Value};
//! use stateplug_store_nebula::NebulaStore;
//!
//! # async fn run(connector: Arc<dyn Connector>) -> stateplug_store::StoreResult<()> {
//! let store = NebulaStore::new(connector);
//! let properties: HashMap<String, String> = [
//!     ("hosts", "graphd-1,graphd-2"),
//!     ("port", "9669"),
//!     ("username", "root"),
//!     ("password", "nebula"),
//!     ("space", "app_state"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_owned(), v.to_owned()))
//! .collect();
//! store.init(&properties).await?;
//!
//! store.set(&OpContext::background(), "user:1", Value::from("{\"name\":\"Alice\"}")).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dialect;
mod quote;

/// Shared test utilities for NebulaGraph backend testing.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

use std::sync::Arc;

/// nGQL dialect and its defaults.
pub use dialect::{DEFAULT_TAG, NebulaDialect};
/// nGQL string literal escaping.
pub use quote::quote;
use stateplug_store::{Adapter, Connector, Dialect, StateStore};

/// Store name under which this backend is registered.
pub const STORE_NAME: &str = NebulaDialect::STORE_NAME;

/// NebulaGraph-backed state store.
pub type NebulaStore = Adapter<NebulaDialect>;

/// Creates an uninitialized NebulaGraph store as a trait object.
#[must_use]
pub fn create_store(connector: Arc<dyn Connector>) -> Arc<dyn StateStore> {
    Arc::new(NebulaStore::new(connector))
}
