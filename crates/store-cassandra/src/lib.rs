//! Cassandra and ScyllaDB backend for the stateplug state-store adapter.
//!
//! Entries are rows of one table, `keyspace.table`, with
//! `key text PRIMARY KEY, value text`. The generic [`Adapter`] provides
//! configuration, pooling, lifecycle and bulk execution; this crate
//! contributes the [`CassandraDialect`] that spells each operation in CQL.
//!
//! # Configuration
//!
//! | Property | Required | Meaning |
//! |----------|----------|---------|
//! | `hosts` | yes | Comma-separated contact points |
//! | `port` | yes | Native protocol port (e.g. `9042`) |
//! | `username` / `password` | yes | Session credentials |
//! | `keyspace` | yes | Keyspace holding the table |
//! | `table` | no | Table holding the entries (default `items`) |
//! | `replicationFactor` | no | `SimpleStrategy` factor for keyspace creation (default 1) |
//! | `createSchema` | no | Create the keyspace and table on init (default `true`) |
//! | `connectTimeout` / `requestTimeout` | no | Durations such as `5s` |
//!
//! Any other property (for example `consistency`) is passed through to the
//! driver as an option.
//!
//! # Batching
//!
//! Bulk writes of more than [`BULK_THRESHOLD`](stateplug_store::BULK_THRESHOLD)
//! items are sent as one `UNLOGGED BATCH`; bulk reads and deletes use
//! `WHERE key IN (...)`. A rejected batch is retried item by item.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dialect;
mod quote;

/// Shared test utilities for Cassandra backend testing.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

use std::sync::Arc;

/// CQL dialect, its property names and defaults.
pub use dialect::{
    CassandraDialect, DEFAULT_REPLICATION_FACTOR, DEFAULT_TABLE, REPLICATION_FACTOR,
};
/// CQL string literal escaping.
pub use quote::quote;
use stateplug_store::{Adapter, Connector, Dialect, StateStore};

/// Store name under which this backend is registered.
pub const STORE_NAME: &str = CassandraDialect::STORE_NAME;

/// Cassandra-backed state store.
pub type CassandraStore = Adapter<CassandraDialect>;

/// Creates an uninitialized Cassandra store as a trait object.
#[must_use]
pub fn create_store(connector: Arc<dyn Connector>) -> Arc<dyn StateStore> {
    Arc::new(CassandraStore::new(connector))
}
