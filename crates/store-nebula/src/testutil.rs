//! Shared test utilities for the NebulaGraph backend.
//!
//! [`NebulaInterpreter`] understands the nGQL subset [`NebulaDialect`](crate::NebulaDialect)
//! emits, so the adapter can be exercised end to end over the in-memory
//! [`MockConnector`].
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! stateplug-store-nebula = { path = "../store-nebula", features = ["testutil"] }
//! ```

use std::{collections::HashMap, sync::Arc};

use stateplug_store::{
    ResultSet, Row, StateStore,
    testutil::{Cursor, Interpreter, MockConnector, MockTable, properties},
};

use crate::NebulaStore;

/// Interpreter for the nGQL statements [`NebulaDialect`](crate::NebulaDialect) renders.
///
/// All tags share one vertex table; the tag name is parsed but not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NebulaInterpreter;

impl NebulaInterpreter {
    fn yield_rows(
        cursor: &mut Cursor,
        table: &MockTable,
        vids: &[String],
    ) -> Result<ResultSet, String> {
        cursor.expect_word("YIELD")?;
        let rows: Vec<Row> = vids
            .iter()
            .filter_map(|vid| table.get(vid).map(|data| vec![Some(vid.clone()), data.clone()]))
            .collect();
        Ok(ResultSet::with_rows(["key", "data"], rows))
    }

    fn fetch(cursor: &mut Cursor, table: &MockTable) -> Result<ResultSet, String> {
        cursor.expect_words(&["PROP", "ON"])?;
        cursor.name()?;
        let vids = cursor.string_list()?;
        Self::yield_rows(cursor, table, &vids)
    }

    fn insert(cursor: &mut Cursor, table: &mut MockTable) -> Result<ResultSet, String> {
        cursor.expect_word("VERTEX")?;
        cursor.name()?;
        cursor.expect_symbol('(')?;
        cursor.expect_word("data")?;
        cursor.expect_symbol(')')?;
        cursor.expect_word("VALUES")?;

        let mut rows = Vec::new();
        loop {
            let vid = cursor.string()?;
            cursor.expect_symbol(':')?;
            cursor.expect_symbol('(')?;
            let data = cursor.string()?;
            cursor.expect_symbol(')')?;
            rows.push((vid, data));
            if !cursor.eat_symbol(',') {
                break;
            }
        }
        cursor.finish()?;

        for (vid, data) in rows {
            table.insert(vid, Some(data));
        }
        Ok(ResultSet::empty())
    }

    fn lookup(cursor: &mut Cursor, table: &MockTable) -> Result<ResultSet, String> {
        cursor.expect_word("ON")?;
        cursor.name()?;
        cursor.expect_word("YIELD")?;
        cursor.skip_past("LIMIT")?;
        let limit = cursor.number()?;
        cursor.finish()?;

        let rows = table
            .iter()
            .take(limit)
            .map(|(vid, data)| vec![Some(vid.clone()), data.clone()])
            .collect();
        Ok(ResultSet::with_rows(["key", "data"], rows))
    }
}

impl Interpreter for NebulaInterpreter {
    fn execute(&self, table: &mut MockTable, statement: &str) -> Result<ResultSet, String> {
        let mut cursor = Cursor::new(statement)?;

        if cursor.eat_word("USE") {
            cursor.name()?;
            cursor.finish()?;
            Ok(ResultSet::empty())
        } else if cursor.eat_word("YIELD") {
            cursor.skip_past("ok")?;
            Ok(ResultSet::with_rows(["ok"], vec![vec![Some("1".to_owned())]]))
        } else if cursor.eat_word("CREATE") {
            cursor.expect_word("TAG")?;
            Ok(ResultSet::empty())
        } else if cursor.eat_word("FETCH") {
            Self::fetch(&mut cursor, table)
        } else if cursor.eat_word("INSERT") {
            Self::insert(&mut cursor, table)
        } else if cursor.eat_word("DELETE") {
            cursor.expect_word("VERTEX")?;
            let vids = cursor.string_list()?;
            cursor.finish()?;
            for vid in vids {
                table.remove(&vid);
            }
            Ok(ResultSet::empty())
        } else if cursor.eat_word("LOOKUP") {
            Self::lookup(&mut cursor, table)
        } else {
            Err(format!("SyntaxError: unsupported statement near `{statement}'"))
        }
    }
}

/// A mock connector speaking nGQL.
#[must_use]
pub fn mock_connector() -> MockConnector {
    MockConnector::new(NebulaInterpreter)
}

/// Valid properties for a NebulaGraph store in space `test_space`.
#[must_use]
pub fn nebula_properties() -> HashMap<String, String> {
    properties(&[
        ("hosts", "graphd-1, graphd-2"),
        ("port", "9669"),
        ("username", "root"),
        ("password", "nebula"),
        ("space", "test_space"),
    ])
}

/// Creates and initializes a store over `connector`.
///
/// # Panics
///
/// Panics if initialization fails.
pub async fn ready_store(connector: &MockConnector) -> NebulaStore {
    let store = NebulaStore::new(Arc::new(connector.clone()));
    store.init(&nebula_properties()).await.expect("nebula store should initialize");
    store
}
