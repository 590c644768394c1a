//! Adapter core for pluggable key-value state stores.
//!
//! A host application talks to every backend through the [`StateStore`]
//! trait. Each backend contributes only a [`Dialect`]: its configuration
//! field names, its statement text and its capabilities. The generic
//! [`Adapter`] supplies everything else: configuration parsing, a session
//! pool, the initialization lifecycle, bulk strategy selection with a
//! one-shot fallback, bounded enumeration, health and counters.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Host application                        │
//! │            (registry, Arc<dyn StateStore> handles)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      StateStore trait                       │
//! │   init · get · set · delete · bulk_* · query · close        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       Adapter<D>                            │
//! │  Lifecycle │ ConnectionConfig │ ConnectionPool │ Stats      │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │        Dialect (nGQL)        │        Dialect (CQL)         │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │         Connector → DriverPool → DriverSession              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! # #[cfg(feature = "testutil")]
//! # {
//! use std::sync::Arc;
//!
//! use stateplug_store::{
//!     Adapter, OpContext, StateStore, Value,
//!     testutil::{KvDialect, MockConnector, kv_properties},
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = Adapter::<KvDialect>::new(Arc::new(MockConnector::kv()));
//! store.init(&kv_properties()).await?;
//!
//! let ctx = OpContext::background();
//! store.set(&ctx, "user:1", Value::from("Alice")).await?;
//! assert_eq!(store.get(&ctx, "user:1").await?.as_deref(), Some(&b"Alice"[..]));
//!
//! store.close().await?;
//! # Ok::<(), stateplug_store::StoreError>(())
//! # }).unwrap();
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every operation returns [`StoreResult<T>`]. [`StoreError::kind`] classifies
//! failures into the categories hosts branch on; configuration problems carry
//! a [`ConfigError`] naming the offending property.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (mock driver, statement lexer, test dialect,
//!   assertion macros) and the `conformance` suite. Enable this in `[dev-dependencies]`.
//! - **`failpoints`**: Compiles the `fail` crate's fail points so tests can force the batched bulk
//!   path to fail.

#![deny(unsafe_code)]

pub mod adapter;
pub mod bulk;
pub mod config;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod context;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod pool;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use adapter::{Adapter, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT, effective_query_limit};
pub use bulk::{BULK_THRESHOLD, Strategy};
pub use config::{ConfigFields, ConnectionConfig, Credentials, validate_identifier};
pub use context::OpContext;
pub use dialect::{Dialect, MAX_BATCH_ITEMS, ensure_batch_size};
pub use driver::{
    BackendReport, ConnectOptions, Connector, DriverError, DriverErrorKind, DriverPool,
    DriverResult, DriverSession, ResultSet, Row,
};
pub use error::{BoxError, ConfigError, ErrorKind, StoreError, StoreResult};
pub use health::{HealthMetadata, HealthStatus};
pub use lifecycle::Phase;
pub use pool::{ConnectionPool, PooledSession};
pub use stats::{Operation, Stats, StatsSnapshot};
pub use store::{Feature, StateStore};
pub use types::{BulkGetItem, GetResponse, KeyValue, SetItem, Value, validate_key};
