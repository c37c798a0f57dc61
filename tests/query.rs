//! Query service behavior against a populated and a failing store

mod common;

use common::{FaultPlan, FixtureSet, FlakyStore};
use patent_search::config::QueryConfig;
use patent_search::{run_pipeline, Config, QueryService};
use std::sync::Arc;

async fn ingested_store() -> Arc<FlakyStore> {
    let fixtures = FixtureSet::new();
    let store = Arc::new(FlakyStore::reliable());
    let report = run_pipeline(store.clone(), &fixtures.standard(), &Config::default()).await;
    assert!(report.is_success(), "{report:?}");
    store
}

#[tokio::test]
async fn test_search_failure_returns_stable_empty_response() {
    let store = ingested_store().await;
    store.set_plan(FaultPlan {
        fail_search: true,
        ..Default::default()
    });
    let service = QueryService::new(store.clone(), QueryConfig::default());

    let response = service.query("hydrocarbon").await;

    assert!(response.error.as_deref().unwrap().contains("injected search failure"));
    assert_eq!(response.total_count, 0);
    assert!(response.patents.is_empty());
    assert!(response.timeline.is_empty());
    assert!(response.cpc_sections.is_empty());
    assert!(response.inventors.is_empty());
}

#[tokio::test]
async fn test_direct_query_failure_reports_error() {
    let store = ingested_store().await;
    store.set_plan(FaultPlan {
        fail_search: true,
        ..Default::default()
    });
    let service = QueryService::new(store.clone(), QueryConfig::default());

    let response = service.direct_query(Some("catalyst")).await;

    assert!(!response.success);
    assert!(response.error.is_some());
    assert_eq!(response.hit_count, None);
}

#[tokio::test]
async fn test_histogram_and_ranking_from_ingested_data() {
    let store = ingested_store().await;
    let service = QueryService::new(store.clone(), QueryConfig::default());

    let response = service.query("catalyst tile frame").await;

    assert_eq!(response.total_count, 3);
    let mut sections: Vec<(String, usize)> = response
        .cpc_sections
        .iter()
        .map(|s| (s.section.clone(), s.count))
        .collect();
    sections.sort();
    // Each classification contributes its class code and its section letter
    assert_eq!(
        sections,
        vec![("B".to_string(), 2), ("C".to_string(), 2), ("H".to_string(), 2)]
    );

    let years: Vec<&str> = response.timeline.iter().map(|y| y.year.as_str()).collect();
    assert_eq!(years, vec!["1999", "2015", "2018"]);

    let names: Vec<&str> = response.inventors.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Jane Doe", "John Roe"]);
}

#[tokio::test]
async fn test_health_after_ingest() {
    let store = ingested_store().await;
    let service = QueryService::new(store.clone(), QueryConfig::default());

    let health = service.health().await;

    assert_eq!(health.status, "ok");
    assert_eq!(health.documents, Some(3));
}
