//! Driver boundary.
//!
//! The native database client is not part of this crate. A host plugs one in
//! by implementing [`Connector`], [`DriverPool`] and [`DriverSession`] over
//! its client library; the adapter only ever sees statements as text and
//! results as a [`ResultSet`] of nullable text cells.
//!
//! A deterministic in-memory implementation lives in
//! [`testutil`](crate::testutil) behind the `testutil` feature.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Credentials;

/// Result type alias for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;

/// Classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// No endpoint could be reached.
    Unreachable,
    /// The backend rejected the credentials.
    Authentication,
    /// The connection broke mid-request.
    Transport,
    /// The backend sent something the driver could not interpret.
    Protocol,
    /// The pool has been closed.
    PoolClosed,
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unreachable => "unreachable",
            Self::Authentication => "authentication failed",
            Self::Transport => "transport error",
            Self::Protocol => "protocol error",
            Self::PoolClosed => "pool closed",
        };
        f.write_str(name)
    }
}

/// A failure reported by the driver itself, as opposed to a statement the
/// backend executed and rejected (see [`BackendReport`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
}

impl DriverError {
    /// Creates a driver error of the given kind.
    #[must_use]
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// No endpoint could be reached.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Unreachable, message)
    }

    /// The backend rejected the credentials.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Authentication, message)
    }

    /// The connection broke mid-request.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Transport, message)
    }

    /// The backend sent an unparsable response.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Protocol, message)
    }

    /// The pool was used after being closed.
    #[must_use]
    pub fn pool_closed() -> Self {
        Self::new(DriverErrorKind::PoolClosed, "pool has been closed")
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// Returns the driver's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a connector needs to build a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// `host:port` endpoints, in configuration order.
    pub endpoints: Vec<String>,
    /// Upper bound on establishing a connection.
    pub connect_timeout: Option<Duration>,
    /// Upper bound the driver applies to each statement.
    pub request_timeout: Option<Duration>,
    /// Driver-specific options passed through from configuration.
    pub options: BTreeMap<String, String>,
}

/// Error reported by the backend for a statement it executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReport {
    /// Backend-specific error code.
    pub code: i32,
    /// Backend-specific message.
    pub message: String,
}

impl fmt::Display for BackendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// One result row: a cell per column, `None` for a null cell.
pub type Row = Vec<Option<String>>;

/// The outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
    error: Option<BackendReport>,
}

impl ResultSet {
    /// A successful result with no columns, as returned by writes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A successful result carrying rows.
    #[must_use]
    pub fn with_rows<C: Into<String>>(
        columns: impl IntoIterator<Item = C>,
        rows: Vec<Row>,
    ) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows, error: None }
    }

    /// A result the backend marked as failed.
    #[must_use]
    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            error: Some(BackendReport { code, message: message.into() }),
        }
    }

    /// Returns `true` unless the backend reported an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the backend's error report, if any.
    #[must_use]
    pub fn error(&self) -> Option<&BackendReport> {
        self.error.as_ref()
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the result, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the result carries no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds driver pools from connection options.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to the endpoints in `options` and returns a pool.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if no endpoint is reachable or the pool
    /// cannot be built.
    async fn connect(&self, options: &ConnectOptions) -> DriverResult<Arc<dyn DriverPool>>;
}

/// A pool of backend connections shared by concurrent operations.
#[async_trait]
pub trait DriverPool: Send + Sync {
    /// Hands out an authenticated session bound to one pooled connection.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if authentication fails or the pool is
    /// exhausted or closed.
    async fn session(&self, credentials: &Credentials) -> DriverResult<Box<dyn DriverSession>>;

    /// Releases every pooled connection.
    async fn close(&self);
}

/// An authenticated connection used by exactly one operation at a time.
#[async_trait]
pub trait DriverSession: Send {
    /// Executes one statement.
    ///
    /// A statement the backend rejects is returned as a [`ResultSet`] whose
    /// [`error`](ResultSet::error) is set, not as a [`DriverError`].
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the statement could not be delivered or
    /// the response could not be read.
    async fn execute(&mut self, statement: &str) -> DriverResult<ResultSet>;

    /// Returns the connection to its pool.
    fn release(self: Box<Self>);
}
