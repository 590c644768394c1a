//! Bulk get/set/delete with batch-then-fallback execution.
//!
//! Requests of up to [`BULK_THRESHOLD`] items run item by item through the
//! single-operation path. Larger requests first try one batched statement. If
//! that attempt is rejected (it cannot be built, the driver fails, the
//! backend reports an error, or its result cannot be decoded) the whole
//! request is replayed item by item, exactly once.
//!
//! Small bulk writes stop at the first failing item. A write replayed after a
//! rejected batch runs every item, so all well-formed items are applied, and
//! then reports the first failure.
//!
//! ```text
//!  items ──► len == 0 ─────────────────────────────► done
//!        └─► len <= 5 ──────────────► per-item ────► result
//!        └─► len  > 5 ──► batched ─► Applied ──────► result
//!                                └─► Rejected ─► per-item ─► result
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use fail::fail_point;
use tracing::{debug, warn};

use crate::{
    adapter::Connected,
    dialect::Dialect,
    driver::ResultSet,
    error::{StoreError, StoreResult},
    stats::Stats,
    types::{BulkGetItem, SetItem, validate_key},
};

/// Largest request served item by item without trying a batched statement.
pub const BULK_THRESHOLD: usize = 5;

/// How a bulk request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Nothing to do.
    Empty,
    /// One single-item operation per item.
    PerItem,
    /// One batched statement, falling back to per-item if it is rejected.
    Batched,
}

impl Strategy {
    /// Picks the strategy for a request of `len` items.
    #[must_use]
    pub fn for_len(len: usize) -> Self {
        match len {
            0 => Self::Empty,
            n if n <= BULK_THRESHOLD => Self::PerItem,
            _ => Self::Batched,
        }
    }
}

/// Outcome of a batched attempt.
enum BatchAttempt<T> {
    /// The batched statement ran and its result was understood.
    Applied(T),
    /// The batched statement could not be used; fall back.
    Rejected(StoreError),
}

impl<T> From<StoreResult<T>> for BatchAttempt<T> {
    fn from(result: StoreResult<T>) -> Self {
        match result {
            Ok(value) => Self::Applied(value),
            Err(e) => Self::Rejected(e),
        }
    }
}

impl<D: Dialect> Connected<D> {
    pub(crate) async fn bulk_get(&self, keys: &[String], stats: &Stats) -> Vec<BulkGetItem> {
        match Strategy::for_len(keys.len()) {
            Strategy::Empty => Vec::new(),
            Strategy::PerItem => {
                stats.record_per_item();
                self.bulk_get_per_item(keys).await
            },
            Strategy::Batched => match BatchAttempt::from(self.bulk_get_batched(keys).await) {
                BatchAttempt::Applied(items) => {
                    stats.record_batched();
                    items
                },
                BatchAttempt::Rejected(e) => {
                    warn!(
                        key_count = keys.len(),
                        error = %e,
                        "Batched get failed, falling back to per-item"
                    );
                    stats.record_fallback();
                    stats.record_per_item();
                    self.bulk_get_per_item(keys).await
                },
            },
        }
    }

    pub(crate) async fn bulk_set(&self, items: Vec<SetItem>, stats: &Stats) -> StoreResult<()> {
        let mut pairs = Vec::with_capacity(items.len());
        for SetItem { key, value } in items {
            if let Err(e) = validate_key(&key) {
                return Err(e.for_key(key));
            }
            match value.into_text() {
                Ok(text) => pairs.push((key, text)),
                Err(e) => return Err(e.for_key(key)),
            }
        }

        match Strategy::for_len(pairs.len()) {
            Strategy::Empty => Ok(()),
            Strategy::PerItem => {
                stats.record_per_item();
                self.bulk_set_per_item(&pairs).await
            },
            Strategy::Batched => match BatchAttempt::from(self.bulk_set_batched(&pairs).await) {
                BatchAttempt::Applied(()) => {
                    stats.record_batched();
                    Ok(())
                },
                BatchAttempt::Rejected(e) => {
                    warn!(
                        key_count = pairs.len(),
                        error = %e,
                        "Batched set failed, falling back to per-item"
                    );
                    stats.record_fallback();
                    stats.record_per_item();
                    self.bulk_set_fallback(&pairs).await
                },
            },
        }
    }

    pub(crate) async fn bulk_delete(&self, keys: &[String], stats: &Stats) -> StoreResult<()> {
        for key in keys {
            validate_key(key).map_err(|e| e.for_key(key.as_str()))?;
        }

        match Strategy::for_len(keys.len()) {
            Strategy::Empty => Ok(()),
            Strategy::PerItem => {
                stats.record_per_item();
                self.bulk_delete_per_item(keys).await
            },
            Strategy::Batched => match BatchAttempt::from(self.bulk_delete_batched(keys).await) {
                BatchAttempt::Applied(()) => {
                    stats.record_batched();
                    Ok(())
                },
                BatchAttempt::Rejected(e) => {
                    warn!(
                        key_count = keys.len(),
                        error = %e,
                        "Batched delete failed, falling back to per-item"
                    );
                    stats.record_fallback();
                    stats.record_per_item();
                    self.bulk_delete_fallback(keys).await
                },
            },
        }
    }

    async fn bulk_get_per_item(&self, keys: &[String]) -> Vec<BulkGetItem> {
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let outcome = match validate_key(key) {
                Ok(()) => self.get_one(key).await,
                Err(e) => Err(e),
            };
            items.push(match outcome {
                Ok(Some(data)) => BulkGetItem::found(key.as_str(), data),
                Ok(None) => BulkGetItem::missing(key.as_str()),
                Err(e) => BulkGetItem::failed(key.as_str(), e),
            });
        }
        items
    }

    async fn bulk_set_per_item(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        for (key, value) in pairs {
            self.set_one(key, value).await.map_err(|e| e.for_key(key.as_str()))?;
        }
        Ok(())
    }

    async fn bulk_delete_per_item(&self, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            self.delete_one(key).await.map_err(|e| e.for_key(key.as_str()))?;
        }
        Ok(())
    }

    async fn bulk_set_fallback(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let mut first_error = None;
        for (key, value) in pairs {
            if let Err(e) = self.set_one(key, value).await {
                debug!(key = %key, error = %e, "Item failed after batch fallback");
                first_error.get_or_insert_with(|| e.for_key(key.as_str()));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn bulk_delete_fallback(&self, keys: &[String]) -> StoreResult<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.delete_one(key).await {
                debug!(key = %key, error = %e, "Item failed after batch fallback");
                first_error.get_or_insert_with(|| e.for_key(key.as_str()));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn bulk_get_batched(&self, keys: &[String]) -> StoreResult<Vec<BulkGetItem>> {
        let mut unique: Vec<&str> = Vec::with_capacity(keys.len());
        for key in keys {
            if !key.is_empty() && !unique.contains(&key.as_str()) {
                unique.push(key);
            }
        }

        let mut found: HashMap<String, Bytes> = HashMap::with_capacity(unique.len());
        if !unique.is_empty() {
            let statement = self.dialect.bulk_get(&unique)?;
            let result = self.execute_batch(&statement).await?;
            for row in result.rows() {
                let entry = self.dialect.decode_row(&result, row)?;
                found.insert(entry.key, entry.value);
            }
        }

        Ok(keys
            .iter()
            .map(|key| match validate_key(key) {
                Err(e) => BulkGetItem::failed(key.as_str(), e),
                Ok(()) => match found.get(key.as_str()) {
                    Some(data) => BulkGetItem::found(key.as_str(), data.clone()),
                    None => BulkGetItem::missing(key.as_str()),
                },
            })
            .collect())
    }

    async fn bulk_set_batched(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        let borrowed: Vec<(&str, &str)> =
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let statement = self.dialect.bulk_set(&borrowed)?;
        self.execute_batch(&statement).await?;
        Ok(())
    }

    async fn bulk_delete_batched(&self, keys: &[String]) -> StoreResult<()> {
        let borrowed: Vec<&str> = keys.iter().map(String::as_str).collect();
        let statement = self.dialect.bulk_delete(&borrowed)?;
        self.execute_batch(&statement).await?;
        Ok(())
    }

    async fn execute_batch(&self, statement: &str) -> StoreResult<ResultSet> {
        fail_point!("bulk-batched-execute", |_| {
            Err(StoreError::backend("injected failure before batched statement"))
        });

        let mut session = self.pool.acquire().await?;
        let result = session.execute(statement).await?;
        debug!(rows = result.len(), "Batched statement applied");
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::{
        Adapter, ErrorKind, OpContext, StateStore, Value,
        dialect::MAX_BATCH_ITEMS,
        testutil::{KvDialect, MockConnector, kv_properties},
    };

    async fn ready_store() -> (MockConnector, Adapter<KvDialect>) {
        let connector = MockConnector::kv();
        let store = Adapter::<KvDialect>::new(Arc::new(connector.clone()));
        store.init(&kv_properties()).await.expect("init");
        (connector, store)
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("key-{i}")).collect()
    }

    #[rstest]
    #[case::empty(0, Strategy::Empty)]
    #[case::one(1, Strategy::PerItem)]
    #[case::at_threshold(BULK_THRESHOLD, Strategy::PerItem)]
    #[case::above_threshold(BULK_THRESHOLD + 1, Strategy::Batched)]
    #[case::large(500, Strategy::Batched)]
    fn test_strategy_selection(#[case] len: usize, #[case] expected: Strategy) {
        assert_eq!(Strategy::for_len(len), expected);
    }

    #[tokio::test]
    async fn test_empty_requests_do_no_io() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let before = connector.acquired();

        assert!(store.bulk_get(&ctx, &[]).await.unwrap().is_empty());
        store.bulk_set(&ctx, Vec::new()).await.unwrap();
        store.bulk_delete(&ctx, &[]).await.unwrap();

        assert_eq!(connector.acquired(), before);
    }

    #[tokio::test]
    async fn test_small_bulk_set_runs_per_item() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let items: Vec<SetItem> =
            keys(BULK_THRESHOLD).into_iter().map(|k| SetItem::new(k, "v")).collect();

        store.bulk_set(&ctx, items).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.per_item_runs, 1);
        assert_eq!(stats.batched_statements, 0);
        assert_eq!(connector.statements().iter().filter(|s| s.starts_with("PUT")).count(), 5);
    }

    #[tokio::test]
    async fn test_large_bulk_set_uses_one_statement() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let items: Vec<SetItem> = keys(20).into_iter().map(|k| SetItem::new(k, "v")).collect();

        store.bulk_set(&ctx, items).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.batched_statements, 1);
        assert_eq!(stats.fallbacks, 0);
        assert_eq!(connector.statements().iter().filter(|s| s.starts_with("MPUT")).count(), 1);
        assert_eq!(connector.len(), 20);
    }

    #[tokio::test]
    async fn test_batched_get_matches_rows_by_key() {
        let (_connector, store) = ready_store().await;
        let ctx = OpContext::background();
        for key in ["b", "d", "f"] {
            store.set(&ctx, key, Value::from(format!("value-{key}"))).await.unwrap();
        }

        let requested: Vec<String> =
            ["a", "b", "c", "d", "e", "f", "b"].iter().map(|s| (*s).to_owned()).collect();
        let items = store.bulk_get(&ctx, &requested).await.unwrap();

        assert_eq!(items.len(), requested.len());
        for (item, key) in items.iter().zip(&requested) {
            assert_eq!(&item.key, key);
            assert!(item.error.is_none());
        }
        let found: Vec<&str> =
            items.iter().filter(|i| i.is_found()).map(|i| i.key.as_str()).collect();
        assert_eq!(found, vec!["b", "d", "f", "b"]);
        assert_eq!(items[1].data.as_deref(), Some(&b"value-b"[..]));
        assert_eq!(store.stats().batched_statements, 1);
    }

    #[tokio::test]
    async fn test_bulk_get_reports_empty_key_per_item() {
        let (_connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let mut requested = keys(6);
        requested[3] = String::new();

        let items = store.bulk_get(&ctx, &requested).await.unwrap();
        assert!(items[3].is_error());
        assert!(items.iter().enumerate().all(|(i, item)| i == 3 || !item.is_error()));
    }

    #[tokio::test]
    async fn test_bulk_set_validates_before_io() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let before = connector.acquired();

        let mut items: Vec<SetItem> = keys(8).into_iter().map(|k| SetItem::new(k, "v")).collect();
        items[6] = SetItem::new("bad-bytes", vec![0xff_u8]);

        let err = store.bulk_set(&ctx, items).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.key(), Some("bad-bytes"));
        assert_eq!(connector.acquired(), before);
        assert_eq!(connector.len(), 0);
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_key_aborts_before_io() {
        let (connector, store) = ready_store().await;
        let before = connector.acquired();
        let mut requested = keys(3);
        requested.push(String::new());

        let err = store.bulk_delete(&OpContext::background(), &requested).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.key(), Some(""));
        assert_eq!(connector.acquired(), before);
    }

    #[tokio::test]
    async fn test_rejected_batch_falls_back_and_attributes_failure() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        connector.poison("poison");

        let mut items: Vec<SetItem> = keys(9).into_iter().map(|k| SetItem::new(k, "v")).collect();
        items.push(SetItem::new("poison-pill", "v"));

        let err = store.bulk_set(&ctx, items).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.key(), Some("poison-pill"));

        let stats = store.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.batched_statements, 0);
        assert_eq!(connector.len(), 9);
        assert_eq!(connector.acquired(), connector.released());
    }

    #[rstest]
    #[case::first(0)]
    #[case::middle(4)]
    #[tokio::test]
    async fn test_set_fallback_applies_items_after_failing_one(#[case] position: usize) {
        let (connector, store) = ready_store().await;
        connector.poison("poison");

        let mut items: Vec<SetItem> = keys(9).into_iter().map(|k| SetItem::new(k, "v")).collect();
        items.insert(position, SetItem::new("poison-pill", "v"));

        let err = store.bulk_set(&OpContext::background(), items).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.key(), Some("poison-pill"));
        assert_eq!(connector.len(), 9);
        assert!(keys(9).iter().all(|k| connector.value(k).as_deref() == Some("v")));
        assert_eq!(store.stats().fallbacks, 1);
    }

    #[rstest]
    #[case::first(0)]
    #[case::middle(4)]
    #[tokio::test]
    async fn test_delete_fallback_removes_items_after_failing_one(#[case] position: usize) {
        let (connector, store) = ready_store().await;
        let mut requested = keys(9);
        requested.insert(position, "poison-pill".to_owned());
        for key in &requested {
            connector.insert(key.as_str(), "v");
        }
        connector.poison("poison");

        let err = store.bulk_delete(&OpContext::background(), &requested).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.key(), Some("poison-pill"));
        assert_eq!(connector.len(), 1);
        assert_eq!(connector.value("poison-pill").as_deref(), Some("v"));
        assert_eq!(connector.acquired(), connector.released());
    }

    #[tokio::test]
    async fn test_small_write_stops_at_first_failure() {
        let (connector, store) = ready_store().await;
        connector.poison("poison");

        let mut items: Vec<SetItem> = keys(3).into_iter().map(|k| SetItem::new(k, "v")).collect();
        items.insert(1, SetItem::new("poison-pill", "v"));

        let err = store.bulk_set(&OpContext::background(), items).await.unwrap_err();
        assert_eq!(err.key(), Some("poison-pill"));
        assert_eq!(connector.value("key-0").as_deref(), Some("v"));
        assert_eq!(connector.value("key-1"), None);
        assert_eq!(store.stats().fallbacks, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_on_batch_falls_back() {
        let (connector, store) = ready_store().await;
        connector.fail_transport("MPUT");
        let items: Vec<SetItem> = keys(7).into_iter().map(|k| SetItem::new(k, "v")).collect();

        store.bulk_set(&OpContext::background(), items).await.unwrap();
        assert_eq!(connector.len(), 7);
        let stats = store.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.batched_statements, 0);
        assert_eq!(connector.acquired(), connector.released());
    }

    #[tokio::test]
    async fn test_oversized_batch_falls_back() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let requested = keys(MAX_BATCH_ITEMS + 1);

        store.bulk_delete(&ctx, &requested).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.batched_statements, 0);
        assert!(connector.statements().iter().all(|s| !s.starts_with("MDEL")));
    }

    #[tokio::test]
    async fn test_undecodable_batch_result_falls_back() {
        let (connector, store) = ready_store().await;
        let ctx = OpContext::background();
        let requested = keys(7);
        for key in &requested {
            store.set(&ctx, key, Value::from("v")).await.unwrap();
        }
        connector.corrupt_value("key-2");

        let items = store.bulk_get(&ctx, &requested).await.unwrap();
        assert_eq!(store.stats().fallbacks, 1);
        assert!(items[2].is_error());
        assert!(items.iter().enumerate().all(|(i, item)| i == 2 || item.is_found()));
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        /// Requested keys drawn from a small alphabet so duplicates and hits are common.
        fn arb_request() -> impl proptest::strategy::Strategy<Value = (Vec<String>, Vec<String>)> {
            let key = "[a-d]{1,2}['\"]?";
            (
                proptest::collection::vec(key, 0..20),
                proptest::collection::vec(key, 0..10),
            )
        }

        proptest! {
            /// Bulk get answers exactly what single gets answer, in request order,
            /// on either side of the threshold.
            #[test]
            fn bulk_get_matches_single_gets((requested, stored) in arb_request()) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");

                rt.block_on(async {
                    let (_connector, store) = ready_store().await;
                    let ctx = OpContext::background();
                    for key in &stored {
                        store.set(&ctx, key, Value::from(format!("v:{key}"))).await.unwrap();
                    }

                    let items = store.bulk_get(&ctx, &requested).await.unwrap();
                    prop_assert_eq!(items.len(), requested.len());
                    for (item, key) in items.iter().zip(&requested) {
                        prop_assert_eq!(&item.key, key);
                        let single = store.get(&ctx, key).await.unwrap();
                        prop_assert_eq!(&item.data, &single);
                    }
                    Ok(())
                })?;
            }

            /// Values survive quoting through both the single and batched write paths.
            #[test]
            fn values_round_trip_through_quoting(values in proptest::collection::vec(".*", 1..12)) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");

                rt.block_on(async {
                    let (_connector, store) = ready_store().await;
                    let ctx = OpContext::background();
                    let items: Vec<SetItem> = values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| SetItem::new(format!("p-{i}"), v.as_str()))
                        .collect();
                    store.bulk_set(&ctx, items).await.unwrap();

                    for (i, value) in values.iter().enumerate() {
                        let stored = store.get(&ctx, &format!("p-{i}")).await.unwrap();
                        prop_assert_eq!(stored, Some(Bytes::from(value.clone())));
                    }
                    Ok(())
                })?;
            }
        }
    }
}
