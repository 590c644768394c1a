//! The fixed table of backends a host can select.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use stateplug_store::{Connector, StateStore};

/// A backend implementation known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// NebulaGraph, registered as `nebulagraph`.
    Nebula,
    /// Cassandra or ScyllaDB, registered as `cassandra`.
    Cassandra,
}

/// Backend registered when the selection yields nothing usable.
pub const DEFAULT_BACKEND: BackendKind = BackendKind::Nebula;

/// One row of the backend table.
#[derive(Clone, Copy)]
pub(crate) struct BackendEntry {
    /// Lowercase identifiers accepted in the selection.
    pub identifiers: &'static [&'static str],
    pub kind: BackendKind,
    /// Name the store is exposed under.
    pub store_name: &'static str,
    pub construct: fn(Arc<dyn Connector>) -> Arc<dyn StateStore>,
}

impl fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEntry")
            .field("kind", &self.kind)
            .field("store_name", &self.store_name)
            .finish_non_exhaustive()
    }
}

pub(crate) static BACKENDS: [BackendEntry; 2] = [
    BackendEntry {
        identifiers: &["nebulagraph", "nebula"],
        kind: BackendKind::Nebula,
        store_name: stateplug_store_nebula::STORE_NAME,
        construct: stateplug_store_nebula::create_store,
    },
    BackendEntry {
        identifiers: &["cassandra", "scylla"],
        kind: BackendKind::Cassandra,
        store_name: stateplug_store_cassandra::STORE_NAME,
        construct: stateplug_store_cassandra::create_store,
    },
];

impl BackendKind {
    /// Resolves a selection identifier, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let identifier = identifier.trim().to_ascii_lowercase();
        BACKENDS
            .iter()
            .find(|entry| entry.identifiers.contains(&identifier.as_str()))
            .map(|entry| entry.kind)
    }

    /// Returns the store name this backend is exposed under.
    #[must_use]
    pub fn store_name(self) -> &'static str {
        self.entry().store_name
    }

    pub(crate) fn entry(self) -> &'static BackendEntry {
        match self {
            Self::Nebula => &BACKENDS[0],
            Self::Cassandra => &BACKENDS[1],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_name())
    }
}
