//! nGQL statements for the key-value model.
//!
//! Each entry is a vertex whose ID is the key, tagged with one tag (default
//! `state`) carrying a single `data string` property. Sessions switch into
//! the configured space before use, so statements never name the space.
//!
//! | Operation | Statement |
//! |-----------|-----------|
//! | get / bulk get | `FETCH PROP ON t "k", ... YIELD id(vertex) AS key, properties(vertex).data AS data` |
//! | set / bulk set | `INSERT VERTEX t(data) VALUES "k":("v"), ...` |
//! | delete / bulk delete | `DELETE VERTEX "k", ...` |
//! | query | `LOOKUP ON t YIELD ... \| LIMIT n` |

use stateplug_store::{
    ConfigFields, ConnectionConfig, Dialect, Feature, StoreResult, ensure_batch_size,
};
use tracing::debug;

use crate::quote::quote;

/// Tag used when the `tag` property is absent.
pub const DEFAULT_TAG: &str = "state";

const YIELD_COLUMNS: &str = "YIELD id(vertex) AS key, properties(vertex).data AS data";

/// Statement builder for NebulaGraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NebulaDialect {
    space: String,
    tag: String,
}

impl NebulaDialect {
    /// Returns the graph space every session switches into.
    #[must_use]
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Returns the tag holding the entries.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn fetch(&self, vids: &[&str]) -> String {
        let vids: Vec<String> = vids.iter().map(|k| quote(k)).collect();
        format!("FETCH PROP ON {} {} {YIELD_COLUMNS}", self.tag, vids.join(", "))
    }

    fn insert(&self, items: &[(&str, &str)]) -> String {
        let values: Vec<String> =
            items.iter().map(|(k, v)| format!("{}:({})", quote(k), quote(v))).collect();
        format!("INSERT VERTEX {}(data) VALUES {}", self.tag, values.join(", "))
    }

    fn remove(keys: &[&str]) -> String {
        let vids: Vec<String> = keys.iter().map(|k| quote(k)).collect();
        format!("DELETE VERTEX {}", vids.join(", "))
    }
}

impl Dialect for NebulaDialect {
    const STORE_NAME: &'static str = "nebulagraph";
    const FIELDS: ConfigFields = ConfigFields {
        namespace: "space",
        entity: "tag",
        default_entity: DEFAULT_TAG,
        create_schema_default: false,
        dialect_keys: &[],
    };
    const KEY_COLUMN: &'static str = "key";
    const VALUE_COLUMN: &'static str = "data";
    const CAPABILITIES: &'static [Feature] = &[Feature::QueryApi];

    fn from_config(config: &ConnectionConfig) -> StoreResult<Self> {
        debug!(space = config.namespace(), tag = config.entity(), "Configured nGQL dialect");
        Ok(Self { space: config.namespace().to_owned(), tag: config.entity().to_owned() })
    }

    fn session_preamble(&self) -> Option<String> {
        Some(format!("USE `{}`", self.space))
    }

    // graphd accepts these immediately but applies them on a later heartbeat, so the tag may
    // not be writable until a cycle or two after init returns.
    fn schema_statements(&self) -> Vec<String> {
        vec![
            format!("CREATE TAG IF NOT EXISTS {}(data string)", self.tag),
            format!("CREATE TAG INDEX IF NOT EXISTS {0}_index ON {0}()", self.tag),
        ]
    }

    fn ping(&self) -> String {
        "YIELD 1 AS ok".to_owned()
    }

    fn get(&self, key: &str) -> String {
        self.fetch(&[key])
    }

    fn set(&self, key: &str, value: &str) -> String {
        self.insert(&[(key, value)])
    }

    fn delete(&self, key: &str) -> String {
        Self::remove(&[key])
    }

    fn bulk_get(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        Ok(self.fetch(keys))
    }

    fn bulk_set(&self, items: &[(&str, &str)]) -> StoreResult<String> {
        ensure_batch_size(items.len())?;
        Ok(self.insert(items))
    }

    fn bulk_delete(&self, keys: &[&str]) -> StoreResult<String> {
        ensure_batch_size(keys.len())?;
        Ok(Self::remove(keys))
    }

    fn query(&self, limit: usize) -> String {
        format!("LOOKUP ON {} {YIELD_COLUMNS} | LIMIT {limit}", self.tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use stateplug_store::{ErrorKind, MAX_BATCH_ITEMS, testutil::properties};

    use super::*;

    fn dialect(extra: &[(&str, &str)]) -> NebulaDialect {
        let mut props = properties(&[
            ("hosts", "graphd"),
            ("port", "9669"),
            ("username", "root"),
            ("password", "nebula"),
            ("space", "app"),
        ]);
        props.extend(properties(extra));
        let config = ConnectionConfig::from_properties(&NebulaDialect::FIELDS, &props).unwrap();
        NebulaDialect::from_config(&config).unwrap()
    }

    #[test]
    fn test_defaults() {
        let d = dialect(&[]);
        assert_eq!(d.space(), "app");
        assert_eq!(d.tag(), DEFAULT_TAG);
        assert_eq!(d.session_preamble().as_deref(), Some("USE `app`"));
    }

    #[test]
    fn test_single_statements() {
        let d = dialect(&[("tag", "kv")]);
        assert_eq!(
            d.get("user:1"),
            r#"FETCH PROP ON kv "user:1" YIELD id(vertex) AS key, properties(vertex).data AS data"#
        );
        assert_eq!(
            d.set("user:1", r#"{"name":"Alice"}"#),
            r#"INSERT VERTEX kv(data) VALUES "user:1":("{\"name\":\"Alice\"}")"#
        );
        assert_eq!(d.delete("user:1"), r#"DELETE VERTEX "user:1""#);
    }

    #[test]
    fn test_batched_statements() {
        let d = dialect(&[]);
        assert_eq!(
            d.bulk_get(&["a", "b"]).unwrap(),
            r#"FETCH PROP ON state "a", "b" YIELD id(vertex) AS key, properties(vertex).data AS data"#
        );
        assert_eq!(
            d.bulk_set(&[("a", "1"), ("b", "2")]).unwrap(),
            r#"INSERT VERTEX state(data) VALUES "a":("1"), "b":("2")"#
        );
        assert_eq!(d.bulk_delete(&["a", "b"]).unwrap(), r#"DELETE VERTEX "a", "b""#);
    }

    #[test]
    fn test_query_schema_and_ping() {
        let d = dialect(&[]);
        assert_eq!(
            d.query(25),
            "LOOKUP ON state YIELD id(vertex) AS key, properties(vertex).data AS data | LIMIT 25"
        );
        assert_eq!(d.schema_statements(), vec![
            "CREATE TAG IF NOT EXISTS state(data string)",
            "CREATE TAG INDEX IF NOT EXISTS state_index ON state()",
        ]);
        assert_eq!(d.ping(), "YIELD 1 AS ok");
    }

    #[test]
    fn test_oversized_batch_is_refused() {
        let d = dialect(&[]);
        let keys = vec!["k"; MAX_BATCH_ITEMS + 1];
        assert_eq!(d.bulk_get(&keys).unwrap_err().kind(), ErrorKind::Validation);
        assert!(d.bulk_delete(&keys[..MAX_BATCH_ITEMS]).is_ok());
    }

    #[test]
    fn test_invalid_tag_is_rejected() {
        let mut props = properties(&[
            ("hosts", "graphd"),
            ("port", "9669"),
            ("username", "root"),
            ("password", "nebula"),
            ("space", "app"),
            ("tag", "bad tag"),
        ]);
        let err = ConnectionConfig::from_properties(&NebulaDialect::FIELDS, &props).unwrap_err();
        assert_eq!(err.field(), Some("tag"));

        props.insert("space".to_owned(), "1space".to_owned());
        props.remove("tag");
        let err = ConnectionConfig::from_properties(&NebulaDialect::FIELDS, &props).unwrap_err();
        assert_eq!(err.field(), Some("space"));
    }
}
