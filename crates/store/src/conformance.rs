//! Conformance test suite for [`StateStore`] implementations.
//!
//! Async check functions that validate whether a store satisfies the
//! operation contract. Every backend runs the same suite against its own
//! dialect and mock interpreter, so the generic adapter is exercised through
//! real statement text for each backend.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each function with a fresh,
//! initialized store:
//!
//! ```ignore
//! use stateplug_store::conformance;
//! # async fn ready_store() -> stateplug_store::Adapter<stateplug_store::testutil::KvDialect> { todo!() }
//!
//! #[tokio::test]
//! async fn crud_get_returns_none_for_missing_key() {
//!     conformance::crud_get_returns_none_for_missing_key(&ready_store().await).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | CRUD | Upsert, idempotent delete, explicit not-found, input validation |
//! | Bulk | Per-key reporting, bulk/single equivalence on both sides of the threshold |
//! | Query | Bounded enumeration |
//! | Lifecycle | `NotReady` before init, `Closed` after close, context checks |
//! | Scenario | End-to-end user records walk-through |
//! | Concurrent | Parallel operations on a shared store |

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    ErrorKind, assert_kind,
    bulk::BULK_THRESHOLD,
    context::OpContext,
    store::{Feature, StateStore},
    testutil::{make_items, make_keys},
    types::{SetItem, Value},
};

fn ctx() -> OpContext {
    OpContext::background()
}

// ============================================================================
// CRUD
// ============================================================================

/// `get` on a key that was never set returns `Ok(None)`.
pub async fn crud_get_returns_none_for_missing_key<S: StateStore>(store: &S) {
    let result = store.get(&ctx(), "crud:never-set").await;
    assert!(result.is_ok(), "get should not error on missing key: {result:?}");
    assert_eq!(result.expect("checked above"), None, "missing key should return None");
}

/// `set` then `get` returns the same bytes.
pub async fn crud_set_then_get_returns_value<S: StateStore>(store: &S) {
    store.set(&ctx(), "crud:k1", Value::from("v1")).await.expect("set should succeed");
    let value = store.get(&ctx(), "crud:k1").await.expect("get should succeed");
    assert_eq!(value, Some(Bytes::from("v1")));
}

/// `set` on an existing key replaces the value.
pub async fn crud_set_overwrites_existing<S: StateStore>(store: &S) {
    store.set(&ctx(), "crud:k2", Value::from("original")).await.expect("set");
    store.set(&ctx(), "crud:k2", Value::from("updated")).await.expect("overwrite");
    let value = store.get(&ctx(), "crud:k2").await.expect("get");
    assert_eq!(value, Some(Bytes::from("updated")));
}

/// `delete` on a key that was never set succeeds.
pub async fn crud_delete_nonexistent_is_noop<S: StateStore>(store: &S) {
    let result = store.delete(&ctx(), "crud:ghost").await;
    assert!(result.is_ok(), "delete of missing key should not error: {result:?}");
}

/// `delete` removes a key, and a second `delete` still succeeds.
pub async fn crud_delete_removes_key<S: StateStore>(store: &S) {
    store.set(&ctx(), "crud:k3", Value::from("v")).await.expect("set");
    store.delete(&ctx(), "crud:k3").await.expect("delete");
    store.delete(&ctx(), "crud:k3").await.expect("second delete");
    let value = store.get(&ctx(), "crud:k3").await.expect("get after delete");
    assert_eq!(value, None, "key should be gone after delete");
}

/// Byte and text payloads with the same content are stored identically.
pub async fn crud_bytes_and_text_values_are_equivalent<S: StateStore>(store: &S) {
    let json = "{\"name\":\"Alice\"}";
    store.set(&ctx(), "crud:text", Value::from(json)).await.expect("set text");
    store.set(&ctx(), "crud:bytes", Value::from(json.as_bytes())).await.expect("set bytes");

    let text = store.get(&ctx(), "crud:text").await.expect("get text");
    let bytes = store.get(&ctx(), "crud:bytes").await.expect("get bytes");
    assert_eq!(text, bytes);
    assert_eq!(text, Some(Bytes::from(json)));
}

/// Empty keys are rejected with a validation error on every single operation.
pub async fn crud_empty_key_is_validation_error<S: StateStore>(store: &S) {
    assert_kind!(store.get(&ctx(), "").await, ErrorKind::Validation);
    assert_kind!(store.set(&ctx(), "", Value::from("v")).await, ErrorKind::Validation);
    assert_kind!(store.delete(&ctx(), "").await, ErrorKind::Validation);
}

/// Values that are not UTF-8 are rejected before any write.
pub async fn crud_non_utf8_value_is_validation_error<S: StateStore>(store: &S) {
    let result = store.set(&ctx(), "crud:binary", Value::from(vec![0xc3, 0x28])).await;
    assert_kind!(result, ErrorKind::Validation);
    assert_eq!(store.get(&ctx(), "crud:binary").await.expect("get"), None);
}

/// Keys and values containing quoting and escape characters round-trip.
pub async fn crud_special_characters_roundtrip<S: StateStore>(store: &S) {
    let cases = [
        ("crud:quote\"double", "she said \"hi\""),
        ("crud:quote'single", "it's"),
        ("crud:back\\slash", "C:\\path\\to"),
        ("crud:newline", "line one\nline two\r\n\tindented"),
        ("crud:unicode-ключ", "värde 値 🎉"),
        ("crud:statement", "x\"), (\"y\":(\"z'); DROP TABLE items; --"),
    ];

    for (key, value) in cases {
        store.set(&ctx(), key, Value::from(value)).await.expect("set special");
    }
    for (key, value) in cases {
        let stored = store.get(&ctx(), key).await.expect("get special");
        assert_eq!(stored, Some(Bytes::from(value)), "round-trip failed for {key:?}");
    }
}

// ============================================================================
// Bulk
// ============================================================================

async fn assert_bulk_get_matches_single<S: StateStore>(store: &S, prefix: &str, count: usize) {
    let keys = make_keys(prefix, count);
    for key in keys.iter().step_by(2) {
        store.set(&ctx(), key, Value::from(format!("v-{key}"))).await.expect("seed");
    }

    let items = store.bulk_get(&ctx(), &keys).await.expect("bulk_get");
    assert_eq!(items.len(), keys.len());
    for (item, key) in items.iter().zip(&keys) {
        assert_eq!(&item.key, key);
        assert!(item.error.is_none(), "unexpected error for {key}: {:?}", item.error);
        let single = store.get(&ctx(), key).await.expect("get");
        assert_eq!(item.data, single, "bulk and single get disagree for {key}");
    }
}

/// Bulk get at or below the threshold agrees with single gets.
pub async fn bulk_get_small_matches_single_get<S: StateStore>(store: &S) {
    assert_bulk_get_matches_single(store, "bulk-small", BULK_THRESHOLD).await;
}

/// Bulk get above the threshold agrees with single gets.
pub async fn bulk_get_large_matches_single_get<S: StateStore>(store: &S) {
    assert_bulk_get_matches_single(store, "bulk-large", BULK_THRESHOLD * 4 + 1).await;
}

/// Bulk get answers in request order, including duplicates.
pub async fn bulk_get_preserves_order_and_duplicates<S: StateStore>(store: &S) {
    store.set(&ctx(), "order:b", Value::from("B")).await.expect("seed");
    let keys: Vec<String> =
        ["order:c", "order:b", "order:a", "order:b", "order:d", "order:e", "order:b"]
            .iter()
            .map(|k| (*k).to_owned())
            .collect();

    let items = store.bulk_get(&ctx(), &keys).await.expect("bulk_get");
    let returned: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    let requested: Vec<&str> = keys.iter().map(String::as_str).collect();
    assert_eq!(returned, requested);
    assert_eq!(items.iter().filter(|i| i.is_found()).count(), 3);
}

/// An empty key inside a bulk get is reported for that key only.
pub async fn bulk_get_reports_invalid_key_per_item<S: StateStore>(store: &S) {
    for count in [3, BULK_THRESHOLD + 3] {
        let mut keys = make_keys("bulk-invalid", count);
        keys[1] = String::new();

        let items = store.bulk_get(&ctx(), &keys).await.expect("bulk_get");
        assert!(items[1].is_error(), "empty key should carry an error");
        assert!(items.iter().enumerate().all(|(i, item)| i == 1 || !item.is_error()));
    }
}

async fn assert_bulk_set_then_delete<S: StateStore>(store: &S, prefix: &str, count: usize) {
    let items = make_items(prefix, count);
    let keys: Vec<String> = items.iter().map(|i| i.key.clone()).collect();

    store.bulk_set(&ctx(), items).await.expect("bulk_set");
    for key in &keys {
        let value = store.get(&ctx(), key).await.expect("get");
        assert_eq!(value, Some(Bytes::from(format!("value-of-{key}"))));
    }

    store.bulk_delete(&ctx(), &keys).await.expect("bulk_delete");
    for key in &keys {
        assert_eq!(store.get(&ctx(), key).await.expect("get"), None);
    }
}

/// Bulk set and bulk delete at or below the threshold.
pub async fn bulk_set_and_delete_small<S: StateStore>(store: &S) {
    assert_bulk_set_then_delete(store, "bulk-write-small", BULK_THRESHOLD).await;
}

/// Bulk set and bulk delete above the threshold.
pub async fn bulk_set_and_delete_large<S: StateStore>(store: &S) {
    assert_bulk_set_then_delete(store, "bulk-write-large", BULK_THRESHOLD * 10).await;
}

/// Bulk set of values with quoting characters round-trips through the batch.
pub async fn bulk_set_special_characters<S: StateStore>(store: &S) {
    let expected: Vec<(String, String)> = (0..BULK_THRESHOLD + 2)
        .map(|i| (format!("bulk-special:{i}'\""), format!("v{i} \"q\" 'q' \\ \n")))
        .collect();
    let items = expected.iter().map(|(k, v)| SetItem::new(k.as_str(), v.as_str())).collect();

    store.bulk_set(&ctx(), items).await.expect("bulk_set");
    for (key, value) in expected {
        assert_eq!(store.get(&ctx(), &key).await.expect("get"), Some(Bytes::from(value)));
    }
}

/// Empty bulk requests succeed without effect.
pub async fn bulk_empty_requests_are_noops<S: StateStore>(store: &S) {
    assert!(store.bulk_get(&ctx(), &[]).await.expect("bulk_get").is_empty());
    store.bulk_set(&ctx(), Vec::new()).await.expect("bulk_set");
    store.bulk_delete(&ctx(), &[]).await.expect("bulk_delete");
}

/// Bulk set rejects an empty key, naming it, before writing anything.
pub async fn bulk_set_rejects_empty_key_before_writing<S: StateStore>(store: &S) {
    let mut items = make_items("bulk-reject", BULK_THRESHOLD + 1);
    items.push(SetItem::new("", "v"));
    let first = items[0].key.clone();

    let err = store.bulk_set(&ctx(), items).await.expect_err("empty key must fail");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.key(), Some(""));
    assert_eq!(store.get(&ctx(), &first).await.expect("get"), None, "nothing may be written");
}

// ============================================================================
// Query
// ============================================================================

/// Query returns stored entries with their values.
pub async fn query_returns_stored_entries<S: StateStore>(store: &S) {
    let items = make_items("query", 3);
    store.bulk_set(&ctx(), items.clone()).await.expect("bulk_set");

    let entries = store.query(&ctx(), 0).await.expect("query");
    for item in &items {
        let entry = entries.iter().find(|e| e.key == item.key).expect("entry should be listed");
        assert_eq!(entry.value, Bytes::from(format!("value-of-{}", item.key)));
    }
}

/// Query never returns more than the requested limit.
pub async fn query_respects_limit<S: StateStore>(store: &S) {
    store.bulk_set(&ctx(), make_items("query-limit", 8)).await.expect("bulk_set");

    let entries = store.query(&ctx(), 3).await.expect("query");
    assert_eq!(entries.len(), 3);
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Every operation on a store that was never initialized fails with `NotReady`.
pub async fn lifecycle_operations_before_init_fail<S: StateStore>(store: &S) {
    let keys = vec!["k".to_owned()];
    assert_kind!(store.get(&ctx(), "k").await, ErrorKind::NotReady);
    assert_kind!(store.set(&ctx(), "k", Value::from("v")).await, ErrorKind::NotReady);
    assert_kind!(store.delete(&ctx(), "k").await, ErrorKind::NotReady);
    assert_kind!(store.bulk_get(&ctx(), &keys).await, ErrorKind::NotReady);
    assert_kind!(store.bulk_set(&ctx(), vec![SetItem::new("k", "v")]).await, ErrorKind::NotReady);
    assert_kind!(store.bulk_delete(&ctx(), &keys).await, ErrorKind::NotReady);
    assert_kind!(store.query(&ctx(), 10).await, ErrorKind::NotReady);
    assert!(store.health_check(&ctx()).await.is_unhealthy());
}

/// Every operation after `close` fails with `Closed`, and `close` is idempotent.
pub async fn lifecycle_operations_after_close_fail<S: StateStore>(store: &S) {
    store.close().await.expect("close");
    store.close().await.expect("second close");

    let keys = vec!["k".to_owned()];
    assert_kind!(store.get(&ctx(), "k").await, ErrorKind::Closed);
    assert_kind!(store.set(&ctx(), "k", Value::from("v")).await, ErrorKind::Closed);
    assert_kind!(store.delete(&ctx(), "k").await, ErrorKind::Closed);
    assert_kind!(store.bulk_get(&ctx(), &keys).await, ErrorKind::Closed);
    assert_kind!(store.bulk_set(&ctx(), vec![SetItem::new("k", "v")]).await, ErrorKind::Closed);
    assert_kind!(store.bulk_delete(&ctx(), &keys).await, ErrorKind::Closed);
    assert_kind!(store.query(&ctx(), 10).await, ErrorKind::Closed);
    assert!(store.health_check(&ctx()).await.is_unhealthy());
}

/// A cancelled context is rejected before any work.
pub async fn lifecycle_cancelled_context_is_rejected<S: StateStore>(store: &S) {
    let token = CancellationToken::new();
    token.cancel();
    let cancelled = OpContext::background().with_cancellation(token);

    assert_kind!(store.set(&cancelled, "ctx:k", Value::from("v")).await, ErrorKind::Cancelled);
    assert_eq!(store.get(&ctx(), "ctx:k").await.expect("get"), None);
}

/// An expired deadline is rejected before any work.
pub async fn lifecycle_expired_deadline_is_rejected<S: StateStore>(store: &S) {
    let expired = OpContext::with_timeout(Duration::ZERO);
    assert_kind!(store.bulk_get(&expired, &make_keys("ctx", 2)).await, ErrorKind::Timeout);
}

/// Validation runs after the lifecycle check: a closed store reports `Closed`
/// even for an empty key.
pub async fn lifecycle_check_precedes_validation<S: StateStore>(store: &S) {
    store.close().await.expect("close");
    assert_kind!(store.get(&ctx(), "").await, ErrorKind::Closed);
}

// ============================================================================
// Capabilities and health
// ============================================================================

/// Capabilities declare enumeration and nothing the store does not implement.
pub async fn capabilities_are_declared_statically<S: StateStore>(store: &S) {
    let features = store.capabilities();
    assert!(features.contains(&Feature::QueryApi));
    assert!(!features.contains(&Feature::Etag), "no concurrency tokens are maintained");
    assert!(!features.contains(&Feature::Transactional));
    assert_eq!(features, store.capabilities());
}

/// An initialized store with a reachable backend reports healthy.
pub async fn health_check_returns_healthy<S: StateStore>(store: &S) {
    let status = store.health_check(&ctx()).await;
    assert!(status.is_healthy(), "expected healthy, got: {status}");
    assert_eq!(status.metadata().backend, store.name());
}

// ============================================================================
// Scenario
// ============================================================================

/// End-to-end walk through user records.
pub async fn scenario_user_records<S: StateStore>(store: &S) {
    let alice = "{\"name\":\"Alice\"}";
    store.set(&ctx(), "user:1", Value::from(alice)).await.expect("set user:1");
    assert_eq!(store.get(&ctx(), "user:1").await.expect("get"), Some(Bytes::from(alice)));

    store
        .bulk_set(&ctx(), vec![SetItem::new("user:2", "A"), SetItem::new("user:3", "B")])
        .await
        .expect("bulk_set");

    let keys: Vec<String> =
        ["user:1", "user:2", "user:3", "missing"].iter().map(|k| (*k).to_owned()).collect();
    let items = store.bulk_get(&ctx(), &keys).await.expect("bulk_get");
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].data, Some(Bytes::from(alice)));
    assert_eq!(items[1].data, Some(Bytes::from("A")));
    assert_eq!(items[2].data, Some(Bytes::from("B")));
    assert!(!items[3].is_found() && !items[3].is_error());

    store.delete(&ctx(), "user:1").await.expect("delete");
    assert_eq!(store.get(&ctx(), "user:1").await.expect("get"), None);
}

// ============================================================================
// Concurrent
// ============================================================================

/// Parallel sets to different keys all land.
pub async fn concurrent_sets_to_different_keys<S: StateStore + 'static>(store: Arc<S>) {
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            let key = format!("concurrent:{i}");
            store.set(&ctx(), &key, Value::from(format!("v{i}"))).await.expect("set");
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task should not panic");
    }

    for i in 0..16 {
        let value = store.get(&ctx(), &format!("concurrent:{i}")).await.expect("get");
        assert_eq!(value, Some(Bytes::from(format!("v{i}"))));
    }
}

/// Runs every check that works on one shared, initialized store, then closes it.
pub async fn run_all<S: StateStore + 'static>(store: Arc<S>) {
    crud_get_returns_none_for_missing_key(store.as_ref()).await;
    crud_set_then_get_returns_value(store.as_ref()).await;
    crud_set_overwrites_existing(store.as_ref()).await;
    crud_delete_nonexistent_is_noop(store.as_ref()).await;
    crud_delete_removes_key(store.as_ref()).await;
    crud_bytes_and_text_values_are_equivalent(store.as_ref()).await;
    crud_empty_key_is_validation_error(store.as_ref()).await;
    crud_non_utf8_value_is_validation_error(store.as_ref()).await;
    crud_special_characters_roundtrip(store.as_ref()).await;
    bulk_get_small_matches_single_get(store.as_ref()).await;
    bulk_get_large_matches_single_get(store.as_ref()).await;
    bulk_get_preserves_order_and_duplicates(store.as_ref()).await;
    bulk_get_reports_invalid_key_per_item(store.as_ref()).await;
    bulk_set_and_delete_small(store.as_ref()).await;
    bulk_set_and_delete_large(store.as_ref()).await;
    bulk_set_special_characters(store.as_ref()).await;
    bulk_empty_requests_are_noops(store.as_ref()).await;
    bulk_set_rejects_empty_key_before_writing(store.as_ref()).await;
    query_returns_stored_entries(store.as_ref()).await;
    lifecycle_cancelled_context_is_rejected(store.as_ref()).await;
    lifecycle_expired_deadline_is_rejected(store.as_ref()).await;
    capabilities_are_declared_statically(store.as_ref()).await;
    health_check_returns_healthy(store.as_ref()).await;
    scenario_user_records(store.as_ref()).await;
    concurrent_sets_to_different_keys(Arc::clone(&store)).await;
    lifecycle_operations_after_close_fail(store.as_ref()).await;
}
