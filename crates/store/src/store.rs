//! State store contract.
//!
//! This module defines the [`StateStore`] trait, the fixed operation contract a
//! host orchestrator drives. Every backend is exposed through it, so a host
//! holds its stores as `Arc<dyn StateStore>` and never sees backend types.
//!
//! # Contract Summary
//!
//! - **Set is an upsert**: a second set on the same key replaces the value.
//! - **Delete is idempotent**: deleting an absent key succeeds.
//! - **Not found is explicit**: `get` returns `Ok(None)` only when the backend
//!   affirmatively reports no entry. Failures are never reported as absence.
//! - **Bulk is not transactional**: bulk get reports per key; bulk set and bulk
//!   delete abort on the first failing key.
//! - **Lifecycle guarded**: every operation fails with `NotReady` before `init`
//!   and `Closed` after `close`, without touching the backend.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    context::OpContext,
    error::StoreResult,
    health::HealthStatus,
    types::{BulkGetItem, KeyValue, SetItem, Value},
};

/// Optional features a store may declare to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    /// Per-entry concurrency tokens.
    Etag,
    /// Multi-operation transactions.
    Transactional,
    /// Enumeration through [`StateStore::query`].
    QueryApi,
}

/// Key-value state store backed by an external database.
///
/// # Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`init`](StateStore::init) | Validate configuration and connect |
/// | [`get`](StateStore::get) | Retrieve a single value by key |
/// | [`set`](StateStore::set) | Create or replace a value |
/// | [`delete`](StateStore::delete) | Remove a key |
/// | [`bulk_get`](StateStore::bulk_get) | Retrieve many keys, reported per key |
/// | [`bulk_set`](StateStore::bulk_set) | Store many entries, abort on first failure |
/// | [`bulk_delete`](StateStore::bulk_delete) | Remove many keys, abort on first failure |
/// | [`query`](StateStore::query) | Enumerate a bounded number of entries |
/// | [`close`](StateStore::close) | Release the connection pool |
/// | [`capabilities`](StateStore::capabilities) | Static feature declaration |
/// | [`health_check`](StateStore::health_check) | Probe the backend |
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Store name exposed to the host.
    fn name(&self) -> &str;

    /// Validates the property map and connects.
    ///
    /// # Errors
    ///
    /// - `Configuration` if a property is missing or invalid, or the store is
    ///   already initialized
    /// - `Connection` if the pool cannot be built or the schema cannot be
    ///   created
    /// - `Closed` if the store was closed
    #[must_use = "initialization may fail and errors must be handled"]
    async fn init(&self, properties: &HashMap<String, String>) -> StoreResult<()>;

    /// Retrieves a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if the backend reports no entry
    /// - `Err(...)` on validation, lifecycle, connection or backend errors
    #[must_use = "store operations may fail and errors must be handled"]
    async fn get(&self, ctx: &OpContext, key: &str) -> StoreResult<Option<Bytes>>;

    /// Creates or replaces the value for `key`.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn set(&self, ctx: &OpContext, key: &str, value: Value) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn delete(&self, ctx: &OpContext, key: &str) -> StoreResult<()>;

    /// Retrieves many keys.
    ///
    /// Returns one item per requested key, in request order. Per-key failures
    /// are reported in the item; the call itself fails only on lifecycle or
    /// context errors.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn bulk_get(&self, ctx: &OpContext, keys: &[String]) -> StoreResult<Vec<BulkGetItem>>;

    /// Stores many entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Item`](crate::StoreError::Item) naming the first
    /// key that failed. Entries before it may have been applied.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn bulk_set(&self, ctx: &OpContext, items: Vec<SetItem>) -> StoreResult<()>;

    /// Removes many keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Item`](crate::StoreError::Item) naming the first
    /// key that failed. Keys before it may have been removed.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn bulk_delete(&self, ctx: &OpContext, keys: &[String]) -> StoreResult<()>;

    /// Returns up to `limit` entries. A `limit` of zero means the default.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn query(&self, ctx: &OpContext, limit: usize) -> StoreResult<Vec<KeyValue>>;

    /// Releases the connection pool. Idempotent.
    async fn close(&self) -> StoreResult<()>;

    /// Returns the static feature declaration.
    fn capabilities(&self) -> &'static [Feature];

    /// Probes the backend.
    async fn health_check(&self, ctx: &OpContext) -> HealthStatus;
}
