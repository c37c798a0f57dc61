//! End-to-end ingest: stage fixture files, denormalize, query.

mod common;

use common::{FixtureSet, FlakyStore, PatentRow};
use patent_search::pipeline::StageOutcome;
use patent_search::store::StagingStore;
use patent_search::{run_pipeline, Config, EntityKind, IngestInputs, QueryService, TARGET_COLLECTION};
use serde_json::json;
use std::sync::Arc;

fn staged(outcome: &StageOutcome) -> &patent_search::StageReport {
    match outcome {
        StageOutcome::Staged(report) => report,
        StageOutcome::Failed { kind, error } => panic!("{kind} failed: {error}"),
    }
}

#[tokio::test]
async fn test_full_ingest_builds_composites() {
    let fixtures = FixtureSet::new();
    let inputs = fixtures.standard();
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());

    let report = run_pipeline(Arc::clone(&store), &inputs, &Config::default()).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.stages.len(), 7);
    let kinds: Vec<EntityKind> = report.stages.iter().map(|s| staged(s).kind).collect();
    assert_eq!(kinds, EntityKind::ALL.to_vec());

    let denorm = report.denormalization.as_ref().unwrap();
    assert_eq!(denorm.composed, 3);
    assert_eq!(denorm.written, 3);
    assert_eq!(denorm.satellites.len(), 6);
    assert_eq!(store.count(TARGET_COLLECTION).unwrap(), 3);

    let doc = &store.point_query(TARGET_COLLECTION, "1001", 1).unwrap()[0];
    assert_eq!(doc["patent_id"], "1001");
    assert_eq!(doc["claims"].as_array().unwrap().len(), 2);
    assert_eq!(
        doc["claims_text"],
        "A catalyst comprising zeolite The catalyst of claim 1, wherein the zeolite is acidic"
    );
    assert_eq!(doc["people"].as_array().unwrap().len(), 2);
    assert_eq!(doc["cpc_classes"].as_array().unwrap().len(), 2);
    // Duplicate citation rows were collapsed while staging
    assert_eq!(doc["us_citations"].as_array().unwrap().len(), 1);
    assert_eq!(doc["us_app_citations"], json!([]));

    let doc = &store.point_query(TARGET_COLLECTION, "1002", 1).unwrap()[0];
    assert_eq!(doc["summary"], "Tiles that generate power also resist hydrocarbon stains");
    assert_eq!(doc["us_app_citations"][0]["citation_date"], "2010-01-14");

    let doc = &store.point_query(TARGET_COLLECTION, "1003", 1).unwrap()[0];
    assert!(doc.get("summary").is_none());
    assert_eq!(doc["us_citations"][0]["citation_date"], json!(null));
    for facet in ["claims", "people", "cpc_classes"] {
        assert_eq!(doc[facet], json!([]), "{facet}");
    }
}

#[tokio::test]
async fn test_stage_counts_are_reported() {
    let fixtures = FixtureSet::new();
    let inputs = fixtures.standard();
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());

    let report = run_pipeline(store, &inputs, &Config::default()).await;

    let citations = staged(&report.stages[2]);
    assert_eq!(citations.kind, EntityKind::UsCitations);
    assert_eq!(citations.rows_read, 3);
    assert_eq!(citations.records_written, 2);
    assert_eq!(citations.rows_skipped, 1);

    let summaries = staged(&report.stages[6]);
    assert_eq!(summaries.records_written, 1);
    assert_eq!(summaries.rows_skipped, 1);
}

#[tokio::test]
async fn test_restaging_is_deterministic() {
    let fixtures = FixtureSet::new();
    let inputs = fixtures.standard();
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());
    let config = Config::default();

    run_pipeline(Arc::clone(&store), &inputs, &config).await;
    let first: Vec<usize> = EntityKind::ALL
        .iter()
        .map(|k| store.count(k.collection()).unwrap())
        .collect();

    run_pipeline(Arc::clone(&store), &inputs, &config).await;
    let second: Vec<usize> = EntityKind::ALL
        .iter()
        .map(|k| store.count(k.collection()).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(store.count(TARGET_COLLECTION).unwrap(), 3);
}

#[tokio::test]
async fn test_satellites_only_without_bibliographic_skips_denormalization() {
    let fixtures = FixtureSet::new();
    let inputs = IngestInputs {
        claim: Some(fixtures.claims(&[("1", 0, "A claim")])),
        ..Default::default()
    };
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());

    let report = run_pipeline(Arc::clone(&store), &inputs, &Config::default()).await;

    assert!(report.is_success());
    assert!(report.denormalization.is_none());
    assert!(!store.index_exists(TARGET_COLLECTION).unwrap());
}

#[tokio::test]
async fn test_satellites_only_with_existing_bibliographic_denormalizes() {
    let fixtures = FixtureSet::new();
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());
    let config = Config::default();

    let patents = IngestInputs {
        patent: Some(fixtures.patents(&[PatentRow::new("7", "Widget", "2001-02-03", "A widget")])),
        ..Default::default()
    };
    run_pipeline(Arc::clone(&store), &patents, &config).await;

    let claims = IngestInputs {
        claim: Some(fixtures.claims(&[("7", 0, "A widget comprising a gear")])),
        ..Default::default()
    };
    let report = run_pipeline(Arc::clone(&store), &claims, &config).await;

    assert_eq!(report.denormalization.as_ref().unwrap().composed, 1);
    let doc = &store.point_query(TARGET_COLLECTION, "7", 1).unwrap()[0];
    assert_eq!(doc["claims_text"], "A widget comprising a gear");
}

#[tokio::test]
async fn test_failed_stager_does_not_block_others() {
    let fixtures = FixtureSet::new();
    let mut inputs = fixtures.standard();
    inputs.classes = Some(fixtures.write("bad_cpc.csv", "patent_id,cpc_section\n1001,B\n"));
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());

    let report = run_pipeline(Arc::clone(&store), &inputs, &Config::default()).await;

    assert!(!report.is_success());
    let failed: Vec<EntityKind> = report
        .stages
        .iter()
        .filter_map(|s| match s {
            StageOutcome::Failed { kind, .. } => Some(*kind),
            StageOutcome::Staged(_) => None,
        })
        .collect();
    assert_eq!(failed, vec![EntityKind::Classifications]);

    // The classification collection was never created, so its facet is empty
    let denorm = report.denormalization.as_ref().unwrap();
    assert!(!denorm.satellites.contains(&EntityKind::Classifications));
    let doc = &store.point_query(TARGET_COLLECTION, "1001", 1).unwrap()[0];
    assert_eq!(doc["cpc_classes"], json!([]));
}

#[tokio::test]
async fn test_ingest_then_query() {
    let fixtures = FixtureSet::new();
    let inputs = fixtures.standard();
    let store: Arc<dyn StagingStore> = Arc::new(FlakyStore::reliable());
    let config = Config::default();

    run_pipeline(Arc::clone(&store), &inputs, &config).await;
    let service = QueryService::new(Arc::clone(&store), config.query.clone());
    let response = service
        .query("get me all patents with the word hydrocarbon")
        .await;

    assert_eq!(response.error, None);
    assert_eq!(response.total_count, 2);
    let years: Vec<&str> = response.timeline.iter().map(|y| y.year.as_str()).collect();
    assert_eq!(years, vec!["2015", "2018"]);
    assert_eq!(response.inventors[0].name, "Jane Doe");
    assert_eq!(response.inventors[0].count, 2);
}
