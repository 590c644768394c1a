//! Shared test utilities for store adapters.
//!
//! Feature-gated behind `testutil` so none of it ships in production builds.
//!
//! - [`MockConnector`]: in-memory driver with fault injection
//! - [`Interpreter`] and [`tokenize`]: building blocks for backend-specific mock interpreters
//! - [`KvDialect`]: a tiny dialect for testing the generic adapter itself
//! - data helpers and `assert_*!` macros
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! stateplug-store = { path = "../store", features = ["testutil"] }
//! ```

mod kv;
mod lexer;
mod mock;

use std::collections::HashMap;

pub use kv::{KvDialect, KvInterpreter, quote_kv};
pub use lexer::{Cursor, Token, tokenize};
pub use mock::{Interpreter, MOCK_REJECTED_CODE, MockConnector, MockTable};

use crate::{error::StoreResult, types::SetItem};

/// Creates a deterministic key such as `"prefix:000042"`.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> String {
    format!("{prefix}:{idx:06}")
}

/// Creates `count` keys with [`make_key`].
#[must_use]
pub fn make_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| make_key(prefix, i)).collect()
}

/// Creates `count` set items whose values name their key.
#[must_use]
pub fn make_items(prefix: &str, count: usize) -> Vec<SetItem> {
    make_keys(prefix, count)
        .into_iter()
        .map(|key| {
            let value = format!("value-of-{key}");
            SetItem::new(key, value)
        })
        .collect()
}

/// Builds a property map from pairs.
#[must_use]
pub fn properties(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

/// Valid properties for [`KvDialect`].
#[must_use]
pub fn kv_properties() -> HashMap<String, String> {
    properties(&[
        ("hosts", "mock-1, mock-2"),
        ("port", "7000"),
        ("username", "tester"),
        ("password", "secret"),
        ("namespace", "test_ns"),
    ])
}

/// Returns `true` if the result is an error of the given kind.
pub fn is_kind<T>(result: &StoreResult<T>, kind: crate::ErrorKind) -> bool {
    matches!(result, Err(e) if e.kind() == kind)
}

/// Assert that a [`StoreResult`](crate::StoreResult) failed with the given
/// [`ErrorKind`](crate::ErrorKind).
///
/// # Examples
///
/// ```
/// use stateplug_store::{ErrorKind, StoreError, StoreResult, assert_kind};
///
/// let result: StoreResult<()> = Err(StoreError::Closed);
/// assert_kind!(result, ErrorKind::Closed);
/// ```
#[macro_export]
macro_rules! assert_kind {
    ($result:expr, $kind:expr) => {
        match &$result {
            Err(e) => assert_eq!(e.kind(), $kind, "unexpected error: {e:?}"),
            Ok(_) => panic!("expected {} error, got Ok", $kind),
        }
    };
    ($result:expr, $kind:expr, $msg:expr) => {
        match &$result {
            Err(e) => assert_eq!(e.kind(), $kind, "{}: unexpected error: {e:?}", $msg),
            Ok(_) => panic!("{}: expected {} error, got Ok", $msg, $kind),
        }
    };
}

/// Assert that a [`StoreResult`](crate::StoreResult) is `Ok`, returning the
/// inner value.
///
/// # Examples
///
/// ```
/// use stateplug_store::{StoreResult, assert_store_ok};
///
/// let result: StoreResult<u32> = Ok(7);
/// assert_eq!(assert_store_ok!(result), 7);
/// ```
#[macro_export]
macro_rules! assert_store_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StoreError: {e:?}"),
        }
    };
}
