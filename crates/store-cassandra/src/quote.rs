//! CQL string literal escaping.
//!
//! Every key and value that reaches a CQL statement, single-item or
//! batched, goes through [`quote`].

/// Renders `value` as a single-quoted CQL string literal, doubling any
/// embedded single quote.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
