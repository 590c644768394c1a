//! CQL statements for the key-value model.
//!
//! Entries live in one table, `keyspace.table` (default table `items`), with
//! `key text PRIMARY KEY, value text`. Statements are fully qualified, so
//! sessions need no preamble.

use stateplug_store::{
    ConfigError, ConfigFields, ConnectionConfig, Dialect, Feature, StoreResult, ensure_batch_size,
};
use tracing::debug;

use crate::quote::quote;

/// Table used when the `table` property is absent.
pub const DEFAULT_TABLE: &str = "items";

/// Property holding the keyspace replication factor.
pub const REPLICATION_FACTOR: &str = "replicationFactor";

/// Replication factor used when [`REPLICATION_FACTOR`] is absent.
pub const DEFAULT_REPLICATION_FACTOR: u32 = 1;

/// Statement builder for Cassandra and ScyllaDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CassandraDialect {
    keyspace: String,
    table: String,
    replication_factor: u32,
}

impl CassandraDialect {
    /// Returns the keyspace.
    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Returns the table name, without keyspace.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the replication factor used when creating the keyspace.
    #[must_use]
    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    fn qualified(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }

    fn in_list(keys: &[&str]) -> String {
        let literals: Vec<String> = keys.iter().map(|k| quote(k)).collect();
        literals.join(", ")
    }
}

fn parse_replication_factor(raw: Option<&str>) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_REPLICATION_FACTOR);
    };
    match raw.parse::<u32>() {
        Ok(0) => Err(ConfigError::invalid(REPLICATION_FACTOR, raw, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::invalid(REPLICATION_FACTOR, raw, e.to_string())),
    }
}

impl Dialect for CassandraDialect {
    const STORE_NAME: &'static str = "cassandra";
    const FIELDS: ConfigFields = ConfigFields {
        namespace: "keyspace",
        entity: "table",
        default_entity: DEFAULT_TABLE,
        create_schema_default: true,
        dialect_keys: &[REPLICATION_FACTOR],
    };
    const KEY_COLUMN: &'static str = "key";
    const VALUE_COLUMN: &'static str = "value";
    const CAPABILITIES: &'static [Feature] = &[Feature::QueryApi];

    fn from_config(config: &ConnectionConfig) -> StoreResult<Self> {
        let replication_factor =
            parse_replication_factor(config.dialect_property(REPLICATION_FACTOR))?;
        debug!(
            keyspace = config.namespace(),
            table = config.entity(),
            replication_factor,
            "Configured CQL dialect"
        );
        Ok(Self {
            keyspace: config.namespace().to_owned(),
            table: config.entity().to_owned(),
            replication_factor,
        })
    }

    fn schema_statements(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                self.keyspace, self.replication_factor
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (key text PRIMARY KEY, value text)",
                self.qualified()
            ),
        ]
    }

    fn ping(&self) -> String {
        "SELECT release_version FROM system.local".to_owned()
    }

    fn get(&self, key: &str) -> String {
        format!("SELECT key, value FROM {} WHERE key = {}", self.qualified(), quote(key))
    }

    fn set(&self, key: &str, value: &str) -> String {
        format!(
            "INSERT INTO {} (key, value) VALUES ({}, {})",
            self.qualified(),
            quote(key),
            quote(value)
        )
    }

    fn delete(&self, key: &str) -> String {
        format!("DELETE FROM {} WHERE key = {}", self.qualified(), quote(key))
    }

    fn bulk_get(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        Ok(format!(
            "SELECT key, value FROM {} WHERE key IN ({})",
            self.qualified(),
            Self::in_list(keys)
        ))
    }

    fn bulk_set(&self, items: &[(&str, &str)]) -> StoreResult<String> {
        ensure_batch_size(items.len())?;
        let inserts: Vec<String> = items.iter().map(|(k, v)| self.set(k, v)).collect();
        Ok(format!("BEGIN UNLOGGED BATCH {}; APPLY BATCH", inserts.join("; ")))
    }

    fn bulk_delete(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        Ok(format!("DELETE FROM {} WHERE key IN ({})", self.qualified(), Self::in_list(keys)))
    }

    fn query(&self, limit: usize) -> String {
        format!("SELECT key, value FROM {} LIMIT {limit}", self.qualified())
    }
}
