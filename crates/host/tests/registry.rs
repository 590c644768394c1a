#![allow(clippy::expect_used, clippy::panic)]
//! Registry built from an environment selection and driven end to end.

use std::{collections::HashMap, sync::Arc};

use rstest::rstest;
use stateplug_host::{BACKENDS_VAR, BackendKind, Connectors, LEGACY_BACKEND_VAR, Registry};
use stateplug_store::{Feature, OpContext, Value};
use stateplug_store_cassandra::testutil::cassandra_properties;
use stateplug_store_nebula::testutil::nebula_properties;

fn connectors() -> Connectors {
    Connectors::new()
        .with(BackendKind::Nebula, Arc::new(stateplug_store_nebula::testutil::mock_connector()))
        .with(
            BackendKind::Cassandra,
            Arc::new(stateplug_store_cassandra::testutil::mock_connector()),
        )
}

fn registry_for(vars: &[(&str, &str)]) -> Registry {
    let vars: HashMap<&str, &str> = vars.iter().copied().collect();
    let selection =
        stateplug_host::selection_from(|name| vars.get(name).map(|v| (*v).to_owned()));
    Registry::build(&selection, &connectors())
}

#[rstest]
#[case::list(&[(BACKENDS_VAR, "cassandra, nebula, cassandra, bogus")], &["cassandra", "nebulagraph"])]
#[case::empty_list(&[(BACKENDS_VAR, "")], &["nebulagraph"])]
#[case::unknown_only(&[(BACKENDS_VAR, "bogus")], &["nebulagraph"])]
#[case::legacy(&[(LEGACY_BACKEND_VAR, "SCYLLA")], &["cassandra"])]
#[case::legacy_shadowed(&[(BACKENDS_VAR, "nebula"), (LEGACY_BACKEND_VAR, "cassandra")], &["nebulagraph"])]
#[case::unset(&[], &["nebulagraph"])]
fn selection_determines_store_names(#[case] vars: &[(&str, &str)], #[case] expected: &[&str]) {
    assert_eq!(registry_for(vars).names(), expected);
}

#[tokio::test]
async fn each_store_serves_its_own_backend() {
    let registry = registry_for(&[(BACKENDS_VAR, "nebula,cassandra")]);
    let ctx = OpContext::background();

    let nebula = registry.get("nebulagraph").expect("nebula store");
    let cassandra = registry.get("cassandra").expect("cassandra store");
    nebula.init(&nebula_properties()).await.expect("init nebula");
    cassandra.init(&cassandra_properties()).await.expect("init cassandra");

    nebula.set(&ctx, "shared", Value::from("graph")).await.expect("nebula set");
    cassandra.set(&ctx, "shared", Value::from("column")).await.expect("cassandra set");

    let from_graph = nebula.get(&ctx, "shared").await.expect("get").expect("present");
    let from_columns = cassandra.get(&ctx, "shared").await.expect("get").expect("present");
    assert_eq!(&from_graph[..], b"graph");
    assert_eq!(&from_columns[..], b"column");

    for (name, store) in registry.iter() {
        assert_eq!(store.capabilities(), &[Feature::QueryApi], "{name}");
        assert!(store.health_check(&ctx).await.is_healthy(), "{name}");
    }

    registry.close_all().await.expect("close_all");
    for (name, store) in registry.iter() {
        assert!(store.health_check(&ctx).await.is_unhealthy(), "{name}");
    }
}

#[test]
fn registry_listing_serializes_backend_kinds() {
    let registry = registry_for(&[(BACKENDS_VAR, "scylla, nebulagraph")]);
    let json = serde_json::to_string(&registry.kinds()).expect("serialize kinds");
    assert_eq!(json, r#"["cassandra","nebula"]"#);
}
