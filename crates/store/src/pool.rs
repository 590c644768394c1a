//! Connection pool wrapper.
//!
//! [`ConnectionPool`] owns the driver pool handle and hands out
//! [`PooledSession`] guards. A guard returns its session to the driver when it
//! is dropped, so every exit path of an operation (including `?` and panics)
//! releases what it acquired.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::{
    config::Credentials,
    driver::{ConnectOptions, Connector, DriverPool, DriverSession, ResultSet},
    error::{StoreError, StoreResult},
};

/// Shared pool of authenticated backend sessions.
pub struct ConnectionPool {
    slot: Mutex<Option<Arc<dyn DriverPool>>>,
    credentials: Credentials,
    preamble: Option<String>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("open", &self.is_open())
            .field("preamble", &self.preamble)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Builds the driver pool.
    ///
    /// `preamble`, when set, is executed on every session before it is handed
    /// out (for example a namespace switch).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if no endpoint is reachable or the
    /// driver cannot build a pool.
    pub async fn initialize(
        connector: &dyn Connector,
        options: &ConnectOptions,
        credentials: Credentials,
        preamble: Option<String>,
    ) -> StoreResult<Self> {
        let driver = connector.connect(options).await.map_err(|e| {
            StoreError::connection_with_source(
                format!("failed to connect to {}", options.endpoints.join(",")),
                e,
            )
        })?;

        info!(endpoints = options.endpoints.len(), "Connection pool initialized");
        Ok(Self { slot: Mutex::new(Some(driver)), credentials, preamble })
    }

    /// Acquires an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool is shut down, the
    /// driver cannot hand out a session, or the session preamble fails.
    pub async fn acquire(&self) -> StoreResult<PooledSession> {
        let driver = self.slot.lock().clone();
        let Some(driver) = driver else {
            return Err(StoreError::connection("connection pool is shut down"));
        };

        let session = driver
            .session(&self.credentials)
            .await
            .map_err(|e| StoreError::connection_with_source("failed to acquire session", e))?;
        let mut session = PooledSession { session: Some(session) };

        if let Some(preamble) = &self.preamble
            && let Err(e) = session.execute(preamble).await
        {
            debug!(error = %e, "Session preamble failed");
            return Err(StoreError::connection(format!("session setup failed: {e}")));
        }

        trace!("Session acquired");
        Ok(session)
    }

    /// Releases every pooled connection.
    ///
    /// Idempotent: the driver pool is closed exactly once however many times
    /// this is called.
    pub async fn shutdown(&self) {
        let driver = self.slot.lock().take();
        if let Some(driver) = driver {
            driver.close().await;
            info!("Connection pool shut down");
        }
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// A session checked out of a [`ConnectionPool`].
///
/// Released back to the driver when dropped.
pub struct PooledSession {
    session: Option<Box<dyn DriverSession>>,
}

impl fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSession").finish_non_exhaustive()
    }
}

impl PooledSession {
    /// Executes one statement, treating a backend-reported failure as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the driver fails or the backend
    /// rejects the statement.
    pub async fn execute(&mut self, statement: &str) -> StoreResult<ResultSet> {
        let Some(session) = self.session.as_mut() else {
            return Err(StoreError::connection("session already released"));
        };

        trace!(statement_len = statement.len(), "Executing statement");
        let result = session.execute(statement).await?;
        match result.error() {
            None => Ok(result),
            Some(report) => Err(StoreError::backend(report.to_string())),
        }
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.release();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{
        assert_kind,
        error::ErrorKind,
        testutil::{MockConnector, quote_kv},
    };

    fn options() -> ConnectOptions {
        ConnectOptions { endpoints: vec!["mock-1:7000".to_owned()], ..ConnectOptions::default() }
    }

    async fn pool(connector: &MockConnector, preamble: Option<&str>) -> ConnectionPool {
        ConnectionPool::initialize(
            connector,
            &options(),
            Credentials::new("tester", "secret"),
            preamble.map(str::to_owned),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_released_on_drop() {
        let connector = MockConnector::kv();
        let pool = pool(&connector, None).await;

        {
            let mut session = pool.acquire().await.unwrap();
            session.execute("PING").await.unwrap();
            assert_eq!(connector.released(), 0);
        }
        assert_eq!(connector.acquired(), 1);
        assert_eq!(connector.released(), 1);
    }

    #[tokio::test]
    async fn test_backend_report_becomes_backend_error() {
        let connector = MockConnector::kv();
        let pool = pool(&connector, None).await;

        let mut session = pool.acquire().await.unwrap();
        let err = session.execute("FROB").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("FROB"), "{err}");
    }

    #[tokio::test]
    async fn test_preamble_runs_on_every_session() {
        let connector = MockConnector::kv();
        let pool = pool(&connector, Some("PING")).await;

        drop(pool.acquire().await.unwrap());
        drop(pool.acquire().await.unwrap());
        assert_eq!(connector.statements(), vec!["PING", "PING"]);
    }

    #[tokio::test]
    async fn test_failed_preamble_releases_session() {
        let connector = MockConnector::kv();
        let preamble = format!("GET {}", quote_kv("x"));
        let pool = pool(&connector, Some(preamble.as_str())).await;
        connector.reject_prefix("GET");

        assert_kind!(pool.acquire().await, ErrorKind::Connection);
        assert_eq!(connector.acquired(), 1);
        assert_eq!(connector.released(), 1);
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_connection_errors() {
        let connector = MockConnector::kv();
        let pool = pool(&connector, None).await;
        connector.reject_credentials(true);

        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(connector.acquired(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_initialize() {
        let connector = MockConnector::kv();
        connector.set_unreachable(true);

        let result = ConnectionPool::initialize(
            &connector,
            &options(),
            Credentials::new("tester", "secret"),
            None,
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("mock-1:7000"), "{err}");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let connector = MockConnector::kv();
        let pool = pool(&connector, None).await;
        assert!(pool.is_open());

        pool.shutdown().await;
        pool.shutdown().await;
        assert!(!pool.is_open());
        assert_eq!(connector.pools_closed(), 1);
        assert_kind!(pool.acquire().await, ErrorKind::Connection);
    }
}
