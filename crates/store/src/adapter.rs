//! Generic adapter implementing [`StateStore`] over any [`Dialect`].
//!
//! Each operation follows the same shape:
//!
//! 1. Clone the connected handle out of the lifecycle lock (fails with
//!    `NotReady`/`Closed` without I/O)
//! 2. Check the caller's [`OpContext`]
//! 3. Validate input
//! 4. Acquire a pooled session, execute, and release it when the guard drops

use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    config::ConnectionConfig,
    context::OpContext,
    dialect::Dialect,
    driver::Connector,
    error::{StoreError, StoreResult},
    health::{HealthMetadata, HealthStatus},
    lifecycle::{Lifecycle, Phase},
    pool::ConnectionPool,
    stats::{Operation, Stats, StatsSnapshot},
    store::{Feature, StateStore},
    types::{BulkGetItem, KeyValue, SetItem, Value, validate_key},
};

/// Number of entries returned by a query with `limit == 0`.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Upper bound on the entries a single query returns.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Everything an initialized adapter owns.
pub(crate) struct Connected<D> {
    pub(crate) dialect: D,
    pub(crate) pool: ConnectionPool,
    pub(crate) config: ConnectionConfig,
}

/// State store over one backend, selected by the dialect `D`.
///
/// Created unconnected; [`StateStore::init`] parses the host's properties and
/// builds the pool.
///
/// # Example
///
/// ```
/// # #[cfg(feature = "testutil")]
/// # {
/// use std::sync::Arc;
///
/// use stateplug_store::{
///     Adapter, OpContext, StateStore,
///     testutil::{KvDialect, MockConnector},
/// };
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = Adapter::<KvDialect>::new(Arc::new(MockConnector::kv()));
/// store.init(&stateplug_store::testutil::kv_properties()).await.unwrap();
///
/// let ctx = OpContext::background();
/// store.set(&ctx, "user:1", "Alice".into()).await.unwrap();
/// assert_eq!(store.get(&ctx, "user:1").await.unwrap().as_deref(), Some(&b"Alice"[..]));
/// # });
/// # }
/// ```
pub struct Adapter<D: Dialect> {
    connector: Arc<dyn Connector>,
    lifecycle: Lifecycle<Connected<D>>,
    stats: Stats,
}

impl<D: Dialect> fmt::Debug for Adapter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("store", &D::STORE_NAME)
            .field("phase", &self.lifecycle.phase())
            .finish_non_exhaustive()
    }
}

impl<D: Dialect> Adapter<D> {
    /// Creates an uninitialized adapter that will connect through `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector, lifecycle: Lifecycle::new(), stats: Stats::new() }
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Returns a snapshot of the operation counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the connected handle, or the lifecycle/context error.
    fn connected(&self, ctx: &OpContext) -> StoreResult<Arc<Connected<D>>> {
        let connected = self.lifecycle.ready()?;
        ctx.check()?;
        Ok(connected)
    }

    fn observe<T>(&self, op: Operation, result: StoreResult<T>) -> StoreResult<T> {
        self.stats.record(op);
        if result.is_err() {
            self.stats.record_error();
        }
        result
    }

    async fn connect(&self, properties: &HashMap<String, String>) -> StoreResult<Connected<D>> {
        let config = ConnectionConfig::from_properties(&D::FIELDS, properties)?;
        let dialect = D::from_config(&config)?;
        let pool = ConnectionPool::initialize(
            self.connector.as_ref(),
            &config.connect_options(),
            config.credentials().clone(),
            dialect.session_preamble(),
        )
        .await?;

        if config.create_schema()
            && let Err(e) = bootstrap_schema(&pool, &dialect).await
        {
            pool.shutdown().await;
            return Err(StoreError::connection_with_source("schema bootstrap failed", e));
        }

        Ok(Connected { dialect, pool, config })
    }
}

async fn bootstrap_schema<D: Dialect>(pool: &ConnectionPool, dialect: &D) -> StoreResult<()> {
    let mut session = pool.acquire().await?;
    for statement in dialect.schema_statements() {
        session.execute(&statement).await?;
    }
    debug!(store = D::STORE_NAME, "Schema bootstrapped");
    Ok(())
}

/// Resets the lifecycle to `Uninitialized` if `init` is abandoned mid-flight.
struct InitGuard<'a, R> {
    lifecycle: &'a Lifecycle<R>,
    armed: bool,
}

impl<R> Drop for InitGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed {
            self.lifecycle.abort_init();
        }
    }
}

impl<D: Dialect> Connected<D> {
    pub(crate) async fn get_one(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut session = self.pool.acquire().await?;
        let result = session.execute(&self.dialect.get(key)).await?;
        drop(session);

        let Some(row) = result.rows().first() else {
            return Ok(None);
        };
        let entry = self.dialect.decode_row(&result, row)?;
        Ok(Some(entry.value))
    }

    pub(crate) async fn set_one(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut session = self.pool.acquire().await?;
        session.execute(&self.dialect.set(key, value)).await?;
        Ok(())
    }

    pub(crate) async fn delete_one(&self, key: &str) -> StoreResult<()> {
        let mut session = self.pool.acquire().await?;
        session.execute(&self.dialect.delete(key)).await?;
        Ok(())
    }

    async fn query(&self, limit: usize, stats: &Stats) -> StoreResult<Vec<KeyValue>> {
        let mut session = self.pool.acquire().await?;
        let result = session.execute(&self.dialect.query(limit)).await?;
        drop(session);

        let mut entries = Vec::with_capacity(result.len());
        let mut skipped = 0u64;
        for row in result.rows() {
            match self.dialect.decode_row(&result, row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Skipping undecodable row");
                },
            }
        }
        stats.record_skipped_rows(skipped);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut session = self.pool.acquire().await?;
        session.execute(&self.dialect.ping()).await?;
        Ok(())
    }
}

/// Maps a requested query limit onto `1..=MAX_QUERY_LIMIT`.
#[must_use]
pub fn effective_query_limit(limit: usize) -> usize {
    match limit {
        0 => DEFAULT_QUERY_LIMIT,
        n => n.min(MAX_QUERY_LIMIT),
    }
}

#[async_trait]
impl<D: Dialect> StateStore for Adapter<D> {
    fn name(&self) -> &str {
        D::STORE_NAME
    }

    #[tracing::instrument(skip(self, properties), fields(store = D::STORE_NAME))]
    async fn init(&self, properties: &HashMap<String, String>) -> StoreResult<()> {
        self.lifecycle.begin_init()?;
        let mut guard = InitGuard { lifecycle: &self.lifecycle, armed: true };

        let connected = match self.connect(properties).await {
            Ok(connected) => Arc::new(connected),
            Err(e) => {
                warn!(error = %e, "Store initialization failed");
                return Err(e);
            },
        };
        guard.armed = false;

        let namespace = connected.config.namespace().to_owned();
        if let Err(connected) = self.lifecycle.complete_init(connected) {
            connected.pool.shutdown().await;
            warn!("Store closed during initialization");
            return Err(StoreError::Closed);
        }

        info!(namespace = %namespace, "Store initialized");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), fields(store = D::STORE_NAME))]
    async fn get(&self, ctx: &OpContext, key: &str) -> StoreResult<Option<Bytes>> {
        let result = async {
            let connected = self.connected(ctx)?;
            validate_key(key)?;
            connected.get_one(key).await
        }
        .await;
        self.observe(Operation::Get, result)
    }

    #[tracing::instrument(skip(self, ctx, value), fields(store = D::STORE_NAME))]
    async fn set(&self, ctx: &OpContext, key: &str, value: Value) -> StoreResult<()> {
        let result = async {
            let connected = self.connected(ctx)?;
            validate_key(key)?;
            let text = value.into_text()?;
            connected.set_one(key, &text).await
        }
        .await;
        self.observe(Operation::Set, result)
    }

    #[tracing::instrument(skip(self, ctx), fields(store = D::STORE_NAME))]
    async fn delete(&self, ctx: &OpContext, key: &str) -> StoreResult<()> {
        let result = async {
            let connected = self.connected(ctx)?;
            validate_key(key)?;
            connected.delete_one(key).await
        }
        .await;
        self.observe(Operation::Delete, result)
    }

    #[tracing::instrument(skip(self, ctx, keys), fields(store = D::STORE_NAME, key_count = keys.len()))]
    async fn bulk_get(&self, ctx: &OpContext, keys: &[String]) -> StoreResult<Vec<BulkGetItem>> {
        let result = async {
            let connected = self.connected(ctx)?;
            Ok(connected.bulk_get(keys, &self.stats).await)
        }
        .await;
        self.observe(Operation::BulkGet, result)
    }

    #[tracing::instrument(skip(self, ctx, items), fields(store = D::STORE_NAME, key_count = items.len()))]
    async fn bulk_set(&self, ctx: &OpContext, items: Vec<SetItem>) -> StoreResult<()> {
        let result = async {
            let connected = self.connected(ctx)?;
            connected.bulk_set(items, &self.stats).await
        }
        .await;
        self.observe(Operation::BulkSet, result)
    }

    #[tracing::instrument(skip(self, ctx, keys), fields(store = D::STORE_NAME, key_count = keys.len()))]
    async fn bulk_delete(&self, ctx: &OpContext, keys: &[String]) -> StoreResult<()> {
        let result = async {
            let connected = self.connected(ctx)?;
            connected.bulk_delete(keys, &self.stats).await
        }
        .await;
        self.observe(Operation::BulkDelete, result)
    }

    #[tracing::instrument(skip(self, ctx), fields(store = D::STORE_NAME))]
    async fn query(&self, ctx: &OpContext, limit: usize) -> StoreResult<Vec<KeyValue>> {
        let result = async {
            let connected = self.connected(ctx)?;
            connected.query(effective_query_limit(limit), &self.stats).await
        }
        .await;
        self.observe(Operation::Query, result)
    }

    #[tracing::instrument(skip(self), fields(store = D::STORE_NAME))]
    async fn close(&self) -> StoreResult<()> {
        if let Some(connected) = self.lifecycle.close() {
            connected.pool.shutdown().await;
            info!("Store closed");
        }
        Ok(())
    }

    fn capabilities(&self) -> &'static [Feature] {
        D::CAPABILITIES
    }

    #[tracing::instrument(skip(self, ctx), fields(store = D::STORE_NAME))]
    async fn health_check(&self, ctx: &OpContext) -> HealthStatus {
        let start = Instant::now();
        let outcome = match self.connected(ctx) {
            Ok(connected) => connected.ping().await.map(|()| connected),
            Err(e) => Err(e),
        };

        let metadata = HealthMetadata::new(start.elapsed(), D::STORE_NAME)
            .with_detail("phase", self.lifecycle.phase().to_string());
        match outcome {
            Ok(connected) => HealthStatus::healthy(
                metadata.with_detail("namespace", connected.config.namespace()),
            ),
            Err(e) => HealthStatus::unhealthy(metadata, e.to_string()),
        }
    }
}
