//! Store error types and result alias.
//!
//! Every failure an adapter reports maps onto one of the variants of
//! [`StoreError`], so a host can decide whether to retry, fix its input, or
//! give up without inspecting backend-specific messages.
//!
//! # Error Types
//!
//! - [`StoreError::Configuration`] - Bad or missing setup input, detected before any I/O
//! - [`StoreError::Connection`] - Pool construction or session acquisition failed
//! - [`StoreError::Validation`] - Malformed caller input (e.g. an empty key), detected before I/O
//! - [`StoreError::Backend`] - The backend executed a statement but reported failure, or returned
//!   an unparsable result
//! - [`StoreError::NotReady`] / [`StoreError::Closed`] - Lifecycle misuse
//! - [`StoreError::Timeout`] / [`StoreError::Cancelled`] - The caller's deadline or cancellation
//!   signal fired before work began
//! - [`StoreError::Item`] - A bulk write aborted on one key; wraps the underlying error
//!
//! # Example
//!
//! ```
//! use stateplug_store::{ErrorKind, StoreError, StoreResult};
//!
//! fn lookup(key: &str) -> StoreResult<()> {
//!     if key.is_empty() {
//!         return Err(StoreError::validation("key must not be empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(lookup("").unwrap_err().kind(), ErrorKind::Validation);
//! ```

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::driver::{DriverError, DriverErrorKind};

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration validation error naming the offending field.
///
/// Produced while mapping the host's property map into a
/// [`ConnectionConfig`](crate::ConnectionConfig). Always surfaced to callers
/// wrapped in [`StoreError::Configuration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required property is absent from the map.
    #[error("missing required property '{field}'")]
    Missing {
        /// Property name.
        field: &'static str,
    },

    /// A required property is present but blank.
    #[error("property '{field}' must not be empty")]
    Empty {
        /// Property name.
        field: &'static str,
    },

    /// A property value could not be interpreted.
    #[error("property '{field}' has invalid value '{value}': {reason}")]
    Invalid {
        /// Property name.
        field: &'static str,
        /// The rejected value (never a secret).
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// `init` was called on an instance that is already initialized.
    #[error("store is already initialized")]
    AlreadyInitialized,
}

impl ConfigError {
    /// Creates an [`Invalid`](ConfigError::Invalid) error.
    #[must_use]
    pub fn invalid(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid { field, value: value.into(), reason: reason.into() }
    }

    /// Returns the property name this error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Missing { field } | Self::Empty { field } | Self::Invalid { field, .. } => {
                Some(field)
            },
            Self::AlreadyInitialized => None,
        }
    }
}

/// Coarse classification of a [`StoreError`].
///
/// This is the taxonomy callers branch on. [`StoreError::Item`] reports the
/// kind of the error it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing setup input.
    Configuration,
    /// The backend could not be reached or a session could not be acquired.
    Connection,
    /// Malformed caller input.
    Validation,
    /// The backend reported a failure or returned an unparsable result.
    Backend,
    /// The store has not been initialized yet.
    NotReady,
    /// The store has been closed.
    Closed,
    /// The caller's deadline had already passed.
    Timeout,
    /// The caller cancelled the operation.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Connection => "connection",
            Self::Validation => "validation",
            Self::Backend => "backend",
            Self::NotReady => "not_ready",
            Self::Closed => "closed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during store operations.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Branch on
/// [`kind()`](StoreError::kind) rather than matching variants exhaustively.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Bad or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Pool construction or session acquisition failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// Malformed caller input.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// The backend reported a failure or returned an unparsable result.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// An operation was invoked before `init` completed.
    #[error("store is not initialized")]
    NotReady,

    /// An operation was invoked after `close`.
    #[error("store is closed")]
    Closed,

    /// The caller's deadline passed before work began.
    #[error("Operation timeout")]
    Timeout,

    /// The caller cancelled the operation before work began.
    #[error("Operation cancelled")]
    Cancelled,

    /// A bulk write aborted on this key.
    #[error("operation failed for key '{key}': {source}")]
    Item {
        /// The key whose operation failed.
        key: String,
        /// The error for that key.
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates a new `Backend` error with the given message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), source: None }
    }

    /// Creates a new `Backend` error with a message and source error.
    #[must_use]
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Wraps this error with the key whose bulk operation failed.
    #[must_use]
    pub fn for_key(self, key: impl Into<String>) -> Self {
        Self::Item { key: key.into(), source: Box::new(self) }
    }

    /// Returns the taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::NotReady => ErrorKind::NotReady,
            Self::Closed => ErrorKind::Closed,
            Self::Timeout => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Item { source, .. } => source.kind(),
        }
    }

    /// Returns the key a bulk failure is attributed to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Item { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Returns `true` for failures that may succeed if the caller retries.
    ///
    /// Configuration, validation and lifecycle errors are never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Backend | ErrorKind::Timeout)
    }
}

/// Driver failures that happen while running a statement are backend errors.
///
/// Connection-phase failures are mapped explicitly by the pool, which knows
/// it is connecting rather than executing.
impl From<DriverError> for StoreError {
    fn from(err: DriverError) -> Self {
        match err.kind() {
            DriverErrorKind::PoolClosed => {
                StoreError::connection_with_source("pool is closed", err)
            },
            _ => {
                let message = err.to_string();
                StoreError::backend_with_source(message, err)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            StoreError::from(ConfigError::Missing { field: "hosts" }).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(StoreError::connection("refused").kind(), ErrorKind::Connection);
        assert_eq!(StoreError::validation("empty key").kind(), ErrorKind::Validation);
        assert_eq!(StoreError::backend("syntax error").kind(), ErrorKind::Backend);
        assert_eq!(StoreError::NotReady.kind(), ErrorKind::NotReady);
        assert_eq!(StoreError::Closed.kind(), ErrorKind::Closed);
        assert_eq!(StoreError::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(StoreError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_item_error_reports_inner_kind_and_key() {
        let err = StoreError::backend("rejected").for_key("user:1");
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.key(), Some("user:1"));
        assert!(err.to_string().contains("user:1"));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::connection("x").is_transient());
        assert!(StoreError::backend("x").is_transient());
        assert!(!StoreError::validation("x").is_transient());
        assert!(!StoreError::Closed.is_transient());
        assert!(!StoreError::from(ConfigError::Empty { field: "port" }).is_transient());
    }

    #[test]
    fn test_config_error_names_field() {
        let err = ConfigError::invalid("port", "abc", "not a number");
        assert_eq!(err.field(), Some("port"));
        assert_eq!(err.to_string(), "property 'port' has invalid value 'abc': not a number");
        assert_eq!(ConfigError::AlreadyInitialized.field(), None);
    }

    #[test]
    fn test_driver_error_mapping() {
        let err: StoreError = DriverError::protocol("bad frame").into();
        assert_eq!(err.kind(), ErrorKind::Backend);

        let err: StoreError = DriverError::pool_closed().into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(StoreError::NotReady.to_string(), "store is not initialized");
        assert_eq!(StoreError::Closed.to_string(), "store is closed");
        assert_eq!(
            StoreError::validation("key must not be empty").to_string(),
            "Validation error: key must not be empty"
        );
        assert_eq!(ErrorKind::NotReady.to_string(), "not_ready");
    }
}
