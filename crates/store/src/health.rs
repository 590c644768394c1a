//! Health reporting for store adapters.
//!
//! [`StateStore::health_check`](crate::StateStore::health_check) runs the
//! backend's cheapest statement on a pooled session and reports the outcome
//! as a [`HealthStatus`]. Lifecycle problems (not yet initialized, closed) are
//! reported as unhealthy without touching the backend.

use std::{collections::BTreeMap, fmt, time::Duration};

/// Health status returned by
/// [`StateStore::health_check`](crate::StateStore::health_check).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stateplug_store::{HealthMetadata, HealthStatus};
///
/// let status = HealthStatus::healthy(HealthMetadata::new(Duration::from_millis(2), "cassandra"));
/// assert!(status.is_healthy());
/// ```
#[derive(Debug, Clone)]
pub enum HealthStatus {
    /// The backend answered the probe.
    Healthy(HealthMetadata),
    /// The backend cannot serve traffic. The `String` describes why.
    Unhealthy(HealthMetadata, String),
}

impl HealthStatus {
    /// Creates a `Healthy` status.
    #[must_use = "creating a status has no side effects"]
    pub fn healthy(metadata: HealthMetadata) -> Self {
        Self::Healthy(metadata)
    }

    /// Creates an `Unhealthy` status with a reason.
    #[must_use = "creating a status has no side effects"]
    pub fn unhealthy(metadata: HealthMetadata, reason: impl Into<String>) -> Self {
        Self::Unhealthy(metadata, reason.into())
    }

    /// Returns `true` if the backend answered the probe.
    #[must_use = "health status predicates should be checked"]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy(_))
    }

    /// Returns `true` if the backend cannot serve traffic.
    #[must_use = "health status predicates should be checked"]
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(..))
    }

    /// Returns the metadata associated with this status.
    #[must_use]
    pub fn metadata(&self) -> &HealthMetadata {
        match self {
            Self::Healthy(m) | Self::Unhealthy(m, _) => m,
        }
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Healthy(_) => None,
            Self::Unhealthy(_, reason) => Some(reason),
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy(m) => write!(f, "healthy ({}ms)", m.check_duration.as_millis()),
            Self::Unhealthy(m, reason) => {
                write!(f, "unhealthy: {} ({}ms)", reason, m.check_duration.as_millis())
            },
        }
    }
}

/// Timing and identification for a health check result.
#[derive(Debug, Clone)]
pub struct HealthMetadata {
    /// How long the check took.
    pub check_duration: Duration,
    /// Store name (e.g. "nebulagraph", "cassandra").
    pub backend: String,
    /// Backend-specific details such as `namespace` or `phase`.
    pub details: BTreeMap<String, String>,
}

impl HealthMetadata {
    /// Creates metadata with the given check duration and store name.
    #[must_use = "constructing metadata has no side effects"]
    pub fn new(check_duration: Duration, backend: impl Into<String>) -> Self {
        Self { check_duration, backend: backend.into(), details: BTreeMap::new() }
    }

    /// Adds a detail entry, returning `self` for chaining.
    #[must_use = "returns the modified metadata for chaining"]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
