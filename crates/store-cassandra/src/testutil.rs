//! Shared test utilities for the Cassandra backend.
//!
//! [`CqlInterpreter`] understands the CQL subset [`CassandraDialect`](crate::CassandraDialect)
//! emits, so the adapter can be exercised end to end over the in-memory
//! [`MockConnector`].
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! stateplug-store-cassandra = { path = "../store-cassandra", features = ["testutil"] }
//! ```

use std::{collections::HashMap, sync::Arc};

use stateplug_store::{
    ResultSet, Row, StateStore,
    testutil::{Cursor, Interpreter, MockConnector, MockTable, properties},
};

use crate::CassandraStore;

/// Version string the mock reports from `system.local`.
pub const MOCK_RELEASE_VERSION: &str = "4.1.3";

/// Interpreter for the CQL statements [`CassandraDialect`](crate::CassandraDialect) renders.
///
/// All tables share one key-value table; table names are parsed but not
/// checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CqlInterpreter;

/// Key restriction of a `WHERE` clause.
fn where_keys(cursor: &mut Cursor) -> Result<Vec<String>, String> {
    cursor.expect_words(&["WHERE", "key"])?;
    if cursor.eat_symbol('=') {
        return Ok(vec![cursor.string()?]);
    }
    cursor.expect_word("IN")?;
    cursor.expect_symbol('(')?;
    let keys = cursor.string_list()?;
    cursor.expect_symbol(')')?;
    Ok(keys)
}

fn qualified_table(cursor: &mut Cursor) -> Result<String, String> {
    let keyspace = cursor.name()?;
    cursor.expect_symbol('.')?;
    Ok(format!("{keyspace}.{}", cursor.name()?))
}

fn rows<'a>(table: &MockTable, keys: impl IntoIterator<Item = &'a String>) -> Vec<Row> {
    keys.into_iter()
        .filter_map(|key| table.get(key).map(|value| vec![Some(key.clone()), value.clone()]))
        .collect()
}

impl CqlInterpreter {
    fn select(cursor: &mut Cursor, table: &MockTable) -> Result<ResultSet, String> {
        if cursor.eat_word("release_version") {
            cursor.expect_word("FROM")?;
            if qualified_table(cursor)? != "system.local" {
                return Err("unconfigured table".to_owned());
            }
            cursor.finish()?;
            let version = vec![vec![Some(MOCK_RELEASE_VERSION.to_owned())]];
            return Ok(ResultSet::with_rows(["release_version"], version));
        }

        cursor.expect_word("key")?;
        cursor.expect_symbol(',')?;
        cursor.expect_words(&["value", "FROM"])?;
        qualified_table(cursor)?;

        if cursor.eat_word("LIMIT") {
            let limit = cursor.number()?;
            cursor.finish()?;
            let listed = rows(table, table.keys().take(limit));
            return Ok(ResultSet::with_rows(["key", "value"], listed));
        }

        let keys = where_keys(cursor)?;
        cursor.finish()?;
        Ok(ResultSet::with_rows(["key", "value"], rows(table, &keys)))
    }

    /// Parses one `INSERT` after its leading keyword.
    fn insert(cursor: &mut Cursor) -> Result<(String, String), String> {
        cursor.expect_word("INTO")?;
        qualified_table(cursor)?;
        cursor.expect_symbol('(')?;
        cursor.expect_word("key")?;
        cursor.expect_symbol(',')?;
        cursor.expect_word("value")?;
        cursor.expect_symbol(')')?;
        cursor.expect_word("VALUES")?;
        cursor.expect_symbol('(')?;
        let key = cursor.string()?;
        cursor.expect_symbol(',')?;
        let value = cursor.string()?;
        cursor.expect_symbol(')')?;
        Ok((key, value))
    }

    fn batch(cursor: &mut Cursor, table: &mut MockTable) -> Result<ResultSet, String> {
        cursor.expect_words(&["UNLOGGED", "BATCH"])?;
        let mut rows = Vec::new();
        while cursor.eat_word("INSERT") {
            rows.push(Self::insert(cursor)?);
            cursor.expect_symbol(';')?;
        }
        cursor.expect_words(&["APPLY", "BATCH"])?;
        cursor.finish()?;
        if rows.is_empty() {
            return Err("empty batch".to_owned());
        }

        for (key, value) in rows {
            table.insert(key, Some(value));
        }
        Ok(ResultSet::empty())
    }
}

impl Interpreter for CqlInterpreter {
    fn execute(&self, table: &mut MockTable, statement: &str) -> Result<ResultSet, String> {
        let mut cursor = Cursor::new(statement)?;

        if cursor.eat_word("SELECT") {
            Self::select(&mut cursor, table)
        } else if cursor.eat_word("INSERT") {
            let (key, value) = Self::insert(&mut cursor)?;
            cursor.finish()?;
            table.insert(key, Some(value));
            Ok(ResultSet::empty())
        } else if cursor.eat_word("DELETE") {
            cursor.expect_word("FROM")?;
            qualified_table(&mut cursor)?;
            let keys = where_keys(&mut cursor)?;
            cursor.finish()?;
            for key in keys {
                table.remove(&key);
            }
            Ok(ResultSet::empty())
        } else if cursor.eat_word("BEGIN") {
            Self::batch(&mut cursor, table)
        } else if cursor.eat_word("CREATE") {
            if !(cursor.at_word("KEYSPACE") || cursor.at_word("TABLE")) {
                return Err(format!("line 1:7 no viable alternative at input '{statement}'"));
            }
            Ok(ResultSet::empty())
        } else {
            Err(format!("line 1:0 no viable alternative at input '{statement}'"))
        }
    }
}

/// A mock connector speaking CQL.
#[must_use]
pub fn mock_connector() -> MockConnector {
    MockConnector::new(CqlInterpreter)
}

/// Valid properties for a Cassandra store in keyspace `test_ks`.
///
/// Schema bootstrap is switched off so tests see only the statements they
/// trigger.
#[must_use]
pub fn cassandra_properties() -> HashMap<String, String> {
    properties(&[
        ("hosts", "cass-1, cass-2, cass-3"),
        ("port", "9042"),
        ("username", "cassandra"),
        ("password", "cassandra"),
        ("keyspace", "test_ks"),
        ("createSchema", "false"),
    ])
}

/// Creates and initializes a store over `connector`.
///
/// # Panics
///
/// Panics if initialization fails.
pub async fn ready_store(connector: &MockConnector) -> CassandraStore {
    let store = CassandraStore::new(Arc::new(connector.clone()));
    store.init(&cassandra_properties()).await.expect("cassandra store should initialize");
    store
}
