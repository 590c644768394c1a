//! Deterministic in-memory driver.
//!
//! [`MockConnector`] implements the driver traits over a shared in-memory
//! table. Statements are handed to an [`Interpreter`] for the backend's
//! language, so adapters are exercised through their real statement text.
//!
//! Fault injection and observation hooks:
//!
//! - [`set_unreachable`](MockConnector::set_unreachable): `connect` fails
//! - [`reject_credentials`](MockConnector::reject_credentials): session acquisition fails
//! - [`poison`](MockConnector::poison): statements containing a substring are rejected by the
//!   backend
//! - [`reject_prefix`](MockConnector::reject_prefix): statements starting with a prefix are
//!   rejected by the backend
//! - [`fail_transport`](MockConnector::fail_transport): statements containing a substring fail in
//!   the driver
//! - [`corrupt_value`](MockConnector::corrupt_value): a stored value comes back as null
//! - [`statements`](MockConnector::statements), [`acquired`](MockConnector::acquired),
//!   [`released`](MockConnector::released), [`pools_closed`](MockConnector::pools_closed)

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    config::Credentials,
    driver::{
        ConnectOptions, Connector, DriverError, DriverPool, DriverResult, DriverSession, ResultSet,
    },
};

/// Error code the mock reports for rejected statements.
pub const MOCK_REJECTED_CODE: i32 = -1005;

/// In-memory table: key to value, `None` for a value that will not decode.
pub type MockTable = BTreeMap<String, Option<String>>;

/// Executes one backend's statement language against a [`MockTable`].
pub trait Interpreter: Send + Sync {
    /// Executes `statement`.
    ///
    /// # Errors
    ///
    /// Returns a message for statements the interpreter does not accept; the
    /// session reports it as a backend error.
    fn execute(&self, table: &mut MockTable, statement: &str) -> Result<ResultSet, String>;
}

#[derive(Default)]
struct MockState {
    table: Mutex<MockTable>,
    statements: Mutex<Vec<String>>,
    poisoned: Mutex<Vec<String>>,
    rejected_prefixes: Mutex<Vec<String>>,
    transport_failures: Mutex<Vec<String>>,
    connect_options: Mutex<Option<ConnectOptions>>,
    connect_delay: Mutex<Option<Duration>>,
    unreachable: AtomicBool,
    reject_credentials: AtomicBool,
    connects: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    pools_closed: AtomicUsize,
}

/// In-memory [`Connector`] with fault injection.
///
/// Clones share state, so a test keeps one clone for assertions and hands
/// another to the adapter.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
    interpreter: Arc<dyn Interpreter>,
}

impl fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnector")
            .field("entries", &self.len())
            .field("connects", &self.connects())
            .finish_non_exhaustive()
    }
}

impl MockConnector {
    /// Creates a connector whose sessions run statements through `interpreter`.
    pub fn new(interpreter: impl Interpreter + 'static) -> Self {
        Self { state: Arc::new(MockState::default()), interpreter: Arc::new(interpreter) }
    }

    /// Makes `connect` fail with an unreachable error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Makes session acquisition fail with an authentication error.
    pub fn reject_credentials(&self, reject: bool) {
        self.state.reject_credentials.store(reject, Ordering::SeqCst);
    }

    /// Delays `connect` by `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock() = Some(delay);
    }

    /// Rejects every statement containing `needle`.
    pub fn poison(&self, needle: impl Into<String>) {
        self.state.poisoned.lock().push(needle.into());
    }

    /// Rejects every statement starting with `prefix`.
    pub fn reject_prefix(&self, prefix: impl Into<String>) {
        self.state.rejected_prefixes.lock().push(prefix.into());
    }

    /// Fails every statement containing `needle` with a transport error.
    pub fn fail_transport(&self, needle: impl Into<String>) {
        self.state.transport_failures.lock().push(needle.into());
    }

    /// Clears all injected statement faults.
    pub fn heal(&self) {
        self.state.poisoned.lock().clear();
        self.state.rejected_prefixes.lock().clear();
        self.state.transport_failures.lock().clear();
    }

    /// Stores `value` for `key` directly, bypassing statements.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.table.lock().insert(key.into(), Some(value.into()));
    }

    /// Makes the stored value for `key` come back as null.
    pub fn corrupt_value(&self, key: &str) {
        if let Some(value) = self.state.table.lock().get_mut(key) {
            *value = None;
        }
    }

    /// Returns the stored value for `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.table.lock().get(key).cloned().flatten()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.table.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every statement executed so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state.statements.lock().clone()
    }

    /// Forgets the executed statements.
    pub fn clear_statements(&self) {
        self.state.statements.lock().clear();
    }

    /// Returns the options passed to the last `connect`.
    #[must_use]
    pub fn connect_options(&self) -> Option<ConnectOptions> {
        self.state.connect_options.lock().clone()
    }

    /// Number of successful `connect` calls.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Number of sessions handed out.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Number of sessions returned.
    #[must_use]
    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    /// Number of driver pools closed.
    #[must_use]
    pub fn pools_closed(&self) -> usize {
        self.state.pools_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, options: &ConnectOptions) -> DriverResult<Arc<dyn DriverPool>> {
        let delay = *self.state.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(DriverError::unreachable(format!(
                "no reachable endpoint among {}",
                options.endpoints.join(",")
            )));
        }

        *self.state.connect_options.lock() = Some(options.clone());
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPool {
            state: Arc::clone(&self.state),
            interpreter: Arc::clone(&self.interpreter),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockPool {
    state: Arc<MockState>,
    interpreter: Arc<dyn Interpreter>,
    closed: AtomicBool,
}

#[async_trait]
impl DriverPool for MockPool {
    async fn session(&self, credentials: &Credentials) -> DriverResult<Box<dyn DriverSession>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::pool_closed());
        }
        if self.state.reject_credentials.load(Ordering::SeqCst) {
            return Err(DriverError::authentication(format!(
                "bad credentials for user '{}'",
                credentials.username()
            )));
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            interpreter: Arc::clone(&self.interpreter),
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.pools_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct MockSession {
    state: Arc<MockState>,
    interpreter: Arc<dyn Interpreter>,
}

#[async_trait]
impl DriverSession for MockSession {
    async fn execute(&mut self, statement: &str) -> DriverResult<ResultSet> {
        self.state.statements.lock().push(statement.to_owned());

        if self.state.transport_failures.lock().iter().any(|n| statement.contains(n.as_str())) {
            return Err(DriverError::transport("connection reset by peer"));
        }
        if self.state.poisoned.lock().iter().any(|n| statement.contains(n.as_str()))
            || self.state.rejected_prefixes.lock().iter().any(|p| statement.starts_with(p.as_str()))
        {
            return Ok(ResultSet::failed(MOCK_REJECTED_CODE, "statement rejected"));
        }

        let mut table = self.state.table.lock();
        Ok(self
            .interpreter
            .execute(&mut table, statement)
            .unwrap_or_else(|message| ResultSet::failed(MOCK_REJECTED_CODE, message)))
    }

    fn release(self: Box<Self>) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}
