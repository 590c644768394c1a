//! Backend selection from the process environment.
//!
//! `STATE_STORE_BACKENDS` holds a comma-separated list of identifiers. The
//! legacy single-value `STATE_STORE_BACKEND` is read only when the list is
//! absent or blank.

use tracing::warn;

use crate::backend::BackendKind;

/// Variable holding the comma-separated backend list.
pub const BACKENDS_VAR: &str = "STATE_STORE_BACKENDS";

/// Legacy single-backend variable.
pub const LEGACY_BACKEND_VAR: &str = "STATE_STORE_BACKEND";

/// Returns the raw selection, preferring the list over the legacy value.
///
/// `lookup` stands in for [`std::env::var`] so selection can be tested
/// without touching the process environment.
pub fn raw_selection<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let not_blank = |value: &String| !value.trim().is_empty();
    lookup(BACKENDS_VAR)
        .filter(not_blank)
        .or_else(|| lookup(LEGACY_BACKEND_VAR).filter(not_blank))
}

/// Resolves a comma-separated identifier list into distinct backends.
///
/// Order follows first appearance. Unknown identifiers and repeats of an
/// already-selected backend are logged and skipped. Blank elements are
/// ignored silently.
#[must_use]
pub fn parse_selection(raw: &str) -> Vec<BackendKind> {
    let mut selected = Vec::new();
    for identifier in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match BackendKind::from_identifier(identifier) {
            Some(kind) if selected.contains(&kind) => {
                warn!(identifier, backend = %kind, "Duplicate state store backend, skipping");
            },
            Some(kind) => selected.push(kind),
            None => warn!(identifier, "Unknown state store backend, skipping"),
        }
    }
    selected
}

/// Reads and resolves the selection through `lookup`.
pub fn selection_from<F>(lookup: F) -> Vec<BackendKind>
where
    F: Fn(&str) -> Option<String>,
{
    raw_selection(lookup).map(|raw| parse_selection(&raw)).unwrap_or_default()
}

/// Reads and resolves the selection from the process environment.
#[must_use]
pub fn selection_from_env() -> Vec<BackendKind> {
    selection_from(|name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;
    use crate::backend::BackendKind::{Cassandra, Nebula};

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name| vars.get(name).cloned()
    }

    #[rstest]
    #[case::mixed("cassandra, nebula, cassandra, bogus", vec![Cassandra, Nebula])]
    #[case::aliases(" Scylla ,NebulaGraph", vec![Cassandra, Nebula])]
    #[case::alias_duplicate("nebula,nebulagraph", vec![Nebula])]
    #[case::blank_elements(",, cassandra ,", vec![Cassandra])]
    #[case::empty("", vec![])]
    #[case::unknown_only("bogus", vec![])]
    fn test_parse_selection(#[case] raw: &str, #[case] expected: Vec<BackendKind>) {
        assert_eq!(parse_selection(raw), expected);
    }

    #[test]
    fn test_list_wins_over_legacy() {
        let lookup = env(&[(BACKENDS_VAR, "cassandra"), (LEGACY_BACKEND_VAR, "nebula")]);
        assert_eq!(selection_from(lookup), vec![Cassandra]);
    }

    #[rstest]
    #[case::absent(&[(LEGACY_BACKEND_VAR, "scylla")])]
    #[case::blank(&[(BACKENDS_VAR, "  "), (LEGACY_BACKEND_VAR, "scylla")])]
    fn test_legacy_used_without_list(#[case] vars: &[(&str, &str)]) {
        assert_eq!(selection_from(env(vars)), vec![Cassandra]);
    }

    #[test]
    fn test_legacy_ignored_when_list_only_has_unknowns() {
        let lookup = env(&[(BACKENDS_VAR, "bogus"), (LEGACY_BACKEND_VAR, "cassandra")]);
        assert!(selection_from(lookup).is_empty());
    }

    #[test]
    fn test_nothing_set() {
        assert_eq!(raw_selection(env(&[])), None);
        assert!(selection_from(env(&[])).is_empty());
    }
}
