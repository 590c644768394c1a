//! Statement rendering and result decoding, per backend.
//!
//! A [`Dialect`] knows how to spell each operation in its backend's statement
//! language and how to read the rows that come back. It performs no I/O; the
//! generic [`Adapter`](crate::Adapter) drives every operation through it.
//!
//! Keys and values are embedded in statements as literals, so each dialect
//! routes every literal (single-item and batched alike) through one escaping
//! helper.

use bytes::Bytes;

use crate::{
    config::{ConfigFields, ConnectionConfig},
    driver::{ResultSet, Row},
    error::{StoreError, StoreResult},
    store::Feature,
    types::KeyValue,
};

/// Largest number of items a batched statement may cover.
pub const MAX_BATCH_ITEMS: usize = 1000;

/// Statement language of one backend.
pub trait Dialect: Send + Sync + Sized + 'static {
    /// Store name exposed to the host (e.g. `"nebulagraph"`).
    const STORE_NAME: &'static str;

    /// Property names and defaults for this backend.
    const FIELDS: ConfigFields;

    /// Name of the result column carrying the key.
    const KEY_COLUMN: &'static str;

    /// Name of the result column carrying the value.
    const VALUE_COLUMN: &'static str;

    /// Optional features this backend supports.
    const CAPABILITIES: &'static [Feature];

    /// Builds the dialect from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if a backend-specific property
    /// is invalid.
    fn from_config(config: &ConnectionConfig) -> StoreResult<Self>;

    /// Statement run on every session before use, if any.
    fn session_preamble(&self) -> Option<String> {
        None
    }

    /// Statements that create the namespace and entity if absent.
    fn schema_statements(&self) -> Vec<String>;

    /// Cheapest statement that proves the backend is answering.
    fn ping(&self) -> String;

    /// Point lookup by key.
    fn get(&self, key: &str) -> String;

    /// Upsert of one entry.
    fn set(&self, key: &str, value: &str) -> String;

    /// Delete by key.
    fn delete(&self, key: &str) -> String;

    /// Lookup of many keys in one statement.
    ///
    /// # Errors
    ///
    /// Fails if the statement cannot be built (see [`ensure_batch_size`]).
    fn bulk_get(&self, keys: &[&str]) -> StoreResult<String>;

    /// Upsert of many entries in one statement.
    ///
    /// # Errors
    ///
    /// Fails if the statement cannot be built (see [`ensure_batch_size`]).
    fn bulk_set(&self, items: &[(&str, &str)]) -> StoreResult<String>;

    /// Delete of many keys in one statement.
    ///
    /// # Errors
    ///
    /// Fails if the statement cannot be built (see [`ensure_batch_size`]).
    fn bulk_delete(&self, keys: &[&str]) -> StoreResult<String>;

    /// Enumeration of up to `limit` entries.
    fn query(&self, limit: usize) -> String;

    /// Decodes one row into an entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the key or value cell is missing or
    /// null.
    fn decode_row(&self, result: &ResultSet, row: &Row) -> StoreResult<KeyValue> {
        let key = cell(result, row, Self::KEY_COLUMN)?;
        let value = cell(result, row, Self::VALUE_COLUMN)?;
        Ok(KeyValue { key: key.to_owned(), value: Bytes::copy_from_slice(value.as_bytes()) })
    }
}

/// Refuses batches larger than [`MAX_BATCH_ITEMS`].
///
/// # Errors
///
/// Returns [`StoreError::Validation`] when `len` exceeds the limit.
pub fn ensure_batch_size(len: usize) -> StoreResult<()> {
    if len > MAX_BATCH_ITEMS {
        return Err(StoreError::validation(format!(
            "batch of {len} items exceeds the limit of {MAX_BATCH_ITEMS}"
        )));
    }
    Ok(())
}

fn cell<'a>(result: &ResultSet, row: &'a Row, column: &str) -> StoreResult<&'a str> {
    let index = result
        .column_index(column)
        .ok_or_else(|| StoreError::backend(format!("result has no '{column}' column")))?;
    row.get(index)
        .and_then(Option::as_deref)
        .ok_or_else(|| StoreError::backend(format!("'{column}' is null")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{ErrorKind, testutil::KvDialect};

    #[test]
    fn test_ensure_batch_size() {
        assert!(ensure_batch_size(MAX_BATCH_ITEMS).is_ok());
        let err = ensure_batch_size(MAX_BATCH_ITEMS + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_decode_row() {
        let dialect = KvDialect::default();
        let result = ResultSet::with_rows(["key", "value"], vec![
            vec![Some("a".to_owned()), Some("1".to_owned())],
            vec![Some("b".to_owned()), None],
        ]);

        let first = dialect.decode_row(&result, &result.rows()[0]).unwrap();
        assert_eq!(first, KeyValue::new("a", "1"));

        let err = dialect.decode_row(&result, &result.rows()[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_decode_row_missing_column() {
        let dialect = KvDialect::default();
        let result = ResultSet::with_rows(["id"], vec![vec![Some("a".to_owned())]]);

        assert!(dialect.decode_row(&result, &result.rows()[0]).is_err());
    }
}
