//! Named store instances built once at startup.

use std::{collections::HashMap, fmt, sync::Arc};

use stateplug_store::{Connector, StateStore, StoreResult};
use tracing::{info, warn};

use crate::{
    backend::{BackendKind, DEFAULT_BACKEND},
    selection::selection_from_env,
};

/// Driver connectors supplied by the host, one per backend kind.
#[derive(Clone, Default)]
pub struct Connectors {
    by_kind: HashMap<BackendKind, Arc<dyn Connector>>,
}

impl Connectors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the connector for `kind`.
    #[must_use]
    pub fn with(mut self, kind: BackendKind, connector: Arc<dyn Connector>) -> Self {
        self.by_kind.insert(kind, connector);
        self
    }

    /// Returns the connector for `kind`, if one was supplied.
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn Connector>> {
        self.by_kind.get(&kind)
    }
}

impl fmt::Debug for Connectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connectors").field("kinds", &self.by_kind.keys()).finish()
    }
}

struct Registered {
    kind: BackendKind,
    store: Arc<dyn StateStore>,
}

/// The stores exposed to the host, keyed by store name.
///
/// Stores are created uninitialized; the host initializes each with its own
/// properties.
pub struct Registry {
    stores: Vec<Registered>,
}

impl Registry {
    /// Builds one store per selected backend.
    ///
    /// A backend without a connector is skipped. When nothing could be
    /// registered, [`DEFAULT_BACKEND`] is tried instead.
    #[must_use]
    pub fn build(selection: &[BackendKind], connectors: &Connectors) -> Self {
        let mut registry = Self { stores: Vec::with_capacity(selection.len()) };
        for &kind in selection {
            registry.register(kind, connectors);
        }

        if registry.stores.is_empty() {
            info!(backend = %DEFAULT_BACKEND, "No state store backend selected, using default");
            registry.register(DEFAULT_BACKEND, connectors);
        }
        if registry.stores.is_empty() {
            warn!("No state store backend could be registered");
        }
        registry
    }

    /// Builds the registry from `STATE_STORE_BACKENDS` (or the legacy
    /// `STATE_STORE_BACKEND`).
    #[must_use]
    pub fn from_env(connectors: &Connectors) -> Self {
        Self::build(&selection_from_env(), connectors)
    }

    fn register(&mut self, kind: BackendKind, connectors: &Connectors) {
        if self.stores.iter().any(|r| r.kind == kind) {
            return;
        }
        let Some(connector) = connectors.get(kind) else {
            warn!(backend = %kind, "No connector supplied for state store backend, skipping");
            return;
        };
        let store = (kind.entry().construct)(Arc::clone(connector));
        info!(backend = %kind, store = store.name(), "Registered state store");
        self.stores.push(Registered { kind, store });
    }

    /// Returns the store exposed under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn StateStore>> {
        self.stores.iter().find(|r| r.store.name() == name).map(|r| &r.store)
    }

    /// Store names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stores.iter().map(|r| r.store.name()).collect()
    }

    /// Backend kinds in registration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.stores.iter().map(|r| r.kind).collect()
    }

    /// Iterates over `(store name, store)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn StateStore>)> {
        self.stores.iter().map(|r| (r.store.name(), &r.store))
    }

    /// Number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether no store could be registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Closes every store.
    ///
    /// All stores are closed even if some fail; the first failure is
    /// returned.
    pub async fn close_all(&self) -> StoreResult<()> {
        let mut first_error = None;
        for (name, store) in self.iter() {
            if let Err(e) = store.close().await {
                warn!(store = name, error = %e, "Failed to close state store");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("stores", &self.names()).finish()
    }
}
