//! Minimal line-oriented dialect for exercising the generic adapter.
//!
//! ```text
//! GET 'k'            PUT 'k' 'v'            DEL 'k'
//! MGET 'a' 'b'       MPUT 'a' '1' 'b' '2'   MDEL 'a' 'b'
//! SCAN 10            PING                   CREATE
//! ```

use crate::{
    config::{ConfigFields, ConnectionConfig},
    dialect::{Dialect, ensure_batch_size},
    driver::ResultSet,
    error::StoreResult,
    store::Feature,
    testutil::{
        lexer::{Token, tokenize},
        mock::{Interpreter, MockConnector, MockTable},
    },
};

/// Quotes a literal for the test dialect.
#[must_use]
pub fn quote_kv(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Test dialect over the [`KvInterpreter`] language.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvDialect;

impl Dialect for KvDialect {
    const STORE_NAME: &'static str = "kv";
    const FIELDS: ConfigFields = ConfigFields {
        namespace: "namespace",
        entity: "table",
        default_entity: "items",
        create_schema_default: false,
        dialect_keys: &[],
    };
    const KEY_COLUMN: &'static str = "key";
    const VALUE_COLUMN: &'static str = "value";
    const CAPABILITIES: &'static [Feature] = &[Feature::QueryApi];

    fn from_config(_config: &ConnectionConfig) -> StoreResult<Self> {
        Ok(Self)
    }

    fn schema_statements(&self) -> Vec<String> {
        vec!["CREATE".to_owned()]
    }

    fn ping(&self) -> String {
        "PING".to_owned()
    }

    fn get(&self, key: &str) -> String {
        format!("GET {}", quote_kv(key))
    }

    fn set(&self, key: &str, value: &str) -> String {
        format!("PUT {} {}", quote_kv(key), quote_kv(value))
    }

    fn delete(&self, key: &str) -> String {
        format!("DEL {}", quote_kv(key))
    }

    fn bulk_get(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        let literals: Vec<String> = keys.iter().map(|k| quote_kv(k)).collect();
        Ok(format!("MGET {}", literals.join(" ")))
    }

    fn bulk_set(&self, items: &[(&str, &str)]) -> StoreResult<String> {
        ensure_batch_size(items.len())?;
        let literals: Vec<String> =
            items.iter().map(|(k, v)| format!("{} {}", quote_kv(k), quote_kv(v))).collect();
        Ok(format!("MPUT {}", literals.join(" ")))
    }

    fn bulk_delete(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        let literals: Vec<String> = keys.iter().map(|k| quote_kv(k)).collect();
        Ok(format!("MDEL {}", literals.join(" ")))
    }

    fn query(&self, limit: usize) -> String {
        format!("SCAN {limit}")
    }
}

/// Interpreter for [`KvDialect`] statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvInterpreter;

impl KvInterpreter {
    fn rows<'a>(
        table: &MockTable,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Vec<Option<String>>> {
        keys.into_iter()
            .filter_map(|key| table.get(key).map(|value| vec![Some(key.to_owned()), value.clone()]))
            .collect()
    }
}

impl Interpreter for KvInterpreter {
    fn execute(&self, table: &mut MockTable, statement: &str) -> Result<ResultSet, String> {
        let tokens = tokenize(statement)?;
        let Some((Token::Word(verb), args)) = tokens.split_first() else {
            return Err(format!("syntax error near '{statement}'"));
        };
        let literals: Vec<&str> = args.iter().filter_map(Token::as_str).collect();
        if literals.len() != args.len() && !verb.eq_ignore_ascii_case("SCAN") {
            return Err(format!("unexpected token in '{statement}'"));
        }

        match (verb.to_ascii_uppercase().as_str(), literals.as_slice()) {
            ("PING", []) => Ok(ResultSet::with_rows(["ok"], vec![vec![Some("1".to_owned())]])),
            ("CREATE", []) => Ok(ResultSet::empty()),
            ("GET", [key]) => {
                Ok(ResultSet::with_rows(["key", "value"], Self::rows(table, [*key])))
            },
            ("PUT", [key, value]) => {
                table.insert((*key).to_owned(), Some((*value).to_owned()));
                Ok(ResultSet::empty())
            },
            ("DEL", [key]) => {
                table.remove(*key);
                Ok(ResultSet::empty())
            },
            ("MGET", keys) if !keys.is_empty() => {
                Ok(ResultSet::with_rows(["key", "value"], Self::rows(table, keys.iter().copied())))
            },
            ("MPUT", pairs) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                for pair in pairs.chunks(2) {
                    table.insert(pair[0].to_owned(), Some(pair[1].to_owned()));
                }
                Ok(ResultSet::empty())
            },
            ("MDEL", keys) if !keys.is_empty() => {
                for key in keys {
                    table.remove(*key);
                }
                Ok(ResultSet::empty())
            },
            ("SCAN", []) => {
                let limit = match args {
                    [Token::Word(n)] => n.parse::<usize>().map_err(|e| e.to_string())?,
                    _ => return Err("SCAN expects a limit".to_owned()),
                };
                let rows = table
                    .iter()
                    .take(limit)
                    .map(|(key, value)| vec![Some(key.clone()), value.clone()])
                    .collect();
                Ok(ResultSet::with_rows(["key", "value"], rows))
            },
            _ => Err(format!("syntax error near '{statement}'")),
        }
    }
}

impl MockConnector {
    /// A connector speaking the [`KvDialect`] language.
    #[must_use]
    pub fn kv() -> Self {
        Self::new(KvInterpreter)
    }
}
