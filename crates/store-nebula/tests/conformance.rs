#![allow(clippy::expect_used, clippy::panic)]
//! Runs the shared conformance suite against the NebulaGraph store over its mock
//! interpreter.

use std::sync::Arc;

use stateplug_store::conformance;
use stateplug_store_nebula::{
    NebulaStore,
    testutil::{mock_connector, ready_store},
};

async fn ready() -> NebulaStore {
    ready_store(&mock_connector()).await
}

#[tokio::test]
async fn crud_get_returns_none_for_missing_key() {
    conformance::crud_get_returns_none_for_missing_key(&ready().await).await;
}

#[tokio::test]
async fn crud_set_then_get_returns_value() {
    conformance::crud_set_then_get_returns_value(&ready().await).await;
}

#[tokio::test]
async fn crud_set_overwrites_existing() {
    conformance::crud_set_overwrites_existing(&ready().await).await;
}

#[tokio::test]
async fn crud_delete_nonexistent_is_noop() {
    conformance::crud_delete_nonexistent_is_noop(&ready().await).await;
}

#[tokio::test]
async fn crud_delete_removes_key() {
    conformance::crud_delete_removes_key(&ready().await).await;
}

#[tokio::test]
async fn crud_bytes_and_text_values_are_equivalent() {
    conformance::crud_bytes_and_text_values_are_equivalent(&ready().await).await;
}

#[tokio::test]
async fn crud_empty_key_is_validation_error() {
    conformance::crud_empty_key_is_validation_error(&ready().await).await;
}

#[tokio::test]
async fn crud_non_utf8_value_is_validation_error() {
    conformance::crud_non_utf8_value_is_validation_error(&ready().await).await;
}

#[tokio::test]
async fn crud_special_characters_roundtrip() {
    conformance::crud_special_characters_roundtrip(&ready().await).await;
}

#[tokio::test]
async fn bulk_get_small_matches_single_get() {
    conformance::bulk_get_small_matches_single_get(&ready().await).await;
}

#[tokio::test]
async fn bulk_get_large_matches_single_get() {
    conformance::bulk_get_large_matches_single_get(&ready().await).await;
}

#[tokio::test]
async fn bulk_get_preserves_order_and_duplicates() {
    conformance::bulk_get_preserves_order_and_duplicates(&ready().await).await;
}

#[tokio::test]
async fn bulk_get_reports_invalid_key_per_item() {
    conformance::bulk_get_reports_invalid_key_per_item(&ready().await).await;
}

#[tokio::test]
async fn bulk_set_and_delete_small() {
    conformance::bulk_set_and_delete_small(&ready().await).await;
}

#[tokio::test]
async fn bulk_set_and_delete_large() {
    conformance::bulk_set_and_delete_large(&ready().await).await;
}

#[tokio::test]
async fn bulk_set_special_characters() {
    conformance::bulk_set_special_characters(&ready().await).await;
}

#[tokio::test]
async fn bulk_empty_requests_are_noops() {
    conformance::bulk_empty_requests_are_noops(&ready().await).await;
}

#[tokio::test]
async fn bulk_set_rejects_empty_key_before_writing() {
    conformance::bulk_set_rejects_empty_key_before_writing(&ready().await).await;
}

#[tokio::test]
async fn query_returns_stored_entries() {
    conformance::query_returns_stored_entries(&ready().await).await;
}

#[tokio::test]
async fn query_respects_limit() {
    conformance::query_respects_limit(&ready().await).await;
}

#[tokio::test]
async fn lifecycle_operations_before_init_fail() {
    let store = NebulaStore::new(Arc::new(mock_connector()));
    conformance::lifecycle_operations_before_init_fail(&store).await;
}

#[tokio::test]
async fn lifecycle_operations_after_close_fail() {
    conformance::lifecycle_operations_after_close_fail(&ready().await).await;
}

#[tokio::test]
async fn lifecycle_cancelled_context_is_rejected() {
    conformance::lifecycle_cancelled_context_is_rejected(&ready().await).await;
}

#[tokio::test]
async fn lifecycle_expired_deadline_is_rejected() {
    conformance::lifecycle_expired_deadline_is_rejected(&ready().await).await;
}

#[tokio::test]
async fn lifecycle_check_precedes_validation() {
    conformance::lifecycle_check_precedes_validation(&ready().await).await;
}

#[tokio::test]
async fn capabilities_are_declared_statically() {
    conformance::capabilities_are_declared_statically(&ready().await).await;
}

#[tokio::test]
async fn health_check_returns_healthy() {
    conformance::health_check_returns_healthy(&ready().await).await;
}

#[tokio::test]
async fn scenario_user_records() {
    conformance::scenario_user_records(&ready().await).await;
}

#[tokio::test]
async fn concurrent_sets_to_different_keys() {
    conformance::concurrent_sets_to_different_keys(Arc::new(ready().await)).await;
}

#[tokio::test]
async fn run_all() {
    conformance::run_all(Arc::new(ready().await)).await;
}
