//! Entry and bulk-operation types shared by every backend.

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

/// A stored entry: key plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key.
    pub key: String,
    /// The value.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// A payload supplied by the caller, as raw bytes or text.
///
/// Backends store values as text, so raw bytes must be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Raw bytes.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Normalizes the payload to its text form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if raw bytes are not valid UTF-8.
    pub fn into_text(self) -> StoreResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|e| StoreError::validation(format!("value is not valid UTF-8: {e}"))),
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Text(t) => t.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// One item of a bulk set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetItem {
    /// The key.
    pub key: String,
    /// The value.
    pub value: Value,
}

impl SetItem {
    /// Creates a new item.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Per-key outcome of a bulk get.
///
/// Exactly one of three states holds: found (`data` set), not found (neither
/// set), or failed (`error` set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkGetItem {
    /// The requested key.
    pub key: String,
    /// The value, when found.
    pub data: Option<Bytes>,
    /// Why the lookup failed for this key.
    pub error: Option<String>,
}

impl BulkGetItem {
    /// A key that was found.
    pub fn found(key: impl Into<String>, data: Bytes) -> Self {
        Self { key: key.into(), data: Some(data), error: None }
    }

    /// A key the backend reported no entry for.
    pub fn missing(key: impl Into<String>) -> Self {
        Self { key: key.into(), data: None, error: None }
    }

    /// A key whose lookup failed.
    pub fn failed(key: impl Into<String>, error: impl ToString) -> Self {
        Self { key: key.into(), data: None, error: Some(error.to_string()) }
    }

    /// Returns `true` if the key was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.data.is_some()
    }

    /// Returns `true` if the lookup failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Flat view of a single get, for hosts that want `{found, data}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResponse {
    /// Whether an entry exists.
    pub found: bool,
    /// The value; empty when not found.
    pub data: Bytes,
}

impl From<Option<Bytes>> for GetResponse {
    fn from(value: Option<Bytes>) -> Self {
        match value {
            Some(data) => Self { found: true, data },
            None => Self { found: false, data: Bytes::new() },
        }
    }
}

/// Rejects empty keys before any I/O.
///
/// # Errors
///
/// Returns [`StoreError::Validation`] if `key` is empty.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::validation("key must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_value_text_and_bytes_normalize_alike() {
        let from_text = Value::from("{\"name\":\"Alice\"}").into_text().unwrap();
        let from_bytes = Value::from(b"{\"name\":\"Alice\"}".as_slice()).into_text().unwrap();
        assert_eq!(from_text, from_bytes);
    }

    #[test]
    fn test_non_utf8_value_is_validation_error() {
        let err = Value::from(vec![0xff, 0xfe]).into_text().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_bulk_get_item_states() {
        let found = BulkGetItem::found("a", Bytes::from_static(b"1"));
        assert!(found.is_found() && !found.is_error());

        let missing = BulkGetItem::missing("b");
        assert!(!missing.is_found() && !missing.is_error());

        let failed = BulkGetItem::failed("c", StoreError::backend("boom"));
        assert!(!failed.is_found() && failed.is_error());
        assert_eq!(failed.error.as_deref(), Some("Backend error: boom"));
    }

    #[test]
    fn test_get_response_view() {
        let found = GetResponse::from(Some(Bytes::from_static(b"v")));
        assert!(found.found);
        assert_eq!(found.data, Bytes::from_static(b"v"));

        let missing = GetResponse::from(None);
        assert!(!missing.found);
        assert!(missing.data.is_empty());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("user:1").is_ok());
        assert_eq!(validate_key("").unwrap_err().kind(), ErrorKind::Validation);
    }
}
