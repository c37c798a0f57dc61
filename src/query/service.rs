//! Query service: search the composite collection and aggregate the hits

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aggregate::{
    aggregate_classification_histogram, aggregate_inventor_ranking, aggregate_timeline,
    InventorCount, SectionCount, YearCount,
};
use super::projection::{project, PatentView};
use super::terms::extract_search_terms;
use super::QueryResult;
use crate::config::QueryConfig;
use crate::model::TARGET_COLLECTION;
use crate::store::{call_with_timeout, Hit, SearchRequest, StagingStore};

/// Fields a natural-language query is matched against
pub const SEARCH_FIELDS: [&str; 3] = ["patent_abstract", "patent_title", "summary"];

/// Term used by the diagnostic query when none is given
pub const DEFAULT_DIRECT_TERM: &str = "hydrocarbon";

const UNREACHABLE_MESSAGE: &str = "Failed to reach the search store";

/// Response to a natural-language query
///
/// The shape is the same on failure: every list is empty, the count is zero,
/// and `error` carries the reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResponse {
    pub total_count: usize,
    pub patents: Vec<PatentView>,
    pub timeline: Vec<YearCount>,
    pub cpc_sections: Vec<SectionCount>,
    pub inventors: Vec<InventorCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResponse {
    pub fn from_patents(patents: Vec<PatentView>) -> Self {
        Self {
            total_count: patents.len(),
            timeline: aggregate_timeline(&patents),
            cpc_sections: aggregate_classification_histogram(&patents),
            inventors: aggregate_inventor_ranking(&patents),
            patents,
            error: None,
            message: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: Some(UNREACHABLE_MESSAGE.to_string()),
            ..Default::default()
        }
    }
}

/// Result of the raw-term diagnostic search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectQueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<usize>,
    /// First hit as `{_id, _source}`, or `{}` when nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reachability of the search collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Answers queries against the composite collection
pub struct QueryService {
    store: Arc<dyn StagingStore>,
    config: QueryConfig,
    collection: String,
}

impl QueryService {
    pub fn new(store: Arc<dyn StagingStore>, config: QueryConfig) -> Self {
        Self {
            store,
            config,
            collection: TARGET_COLLECTION.to_string(),
        }
    }

    /// Query a collection other than the default target
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    async fn run_search(&self, terms: String, fields: &[&str]) -> QueryResult<Vec<Hit>> {
        let request = SearchRequest::new(terms, fields, self.config.result_cap);
        let collection = self.collection.clone();
        let hits = call_with_timeout(&self.store, self.config.store_timeout(), move |store| {
            store.search(&collection, &request)
        })
        .await?;
        Ok(hits)
    }

    /// OR-match `terms` against title, abstract and summary, capped at the
    /// configured result limit.
    pub async fn search(&self, terms: &str) -> QueryResult<Vec<Hit>> {
        self.run_search(terms.to_string(), &SEARCH_FIELDS).await
    }

    /// Extract terms, search, project, and aggregate.
    ///
    /// Never fails: a store error degrades to the empty response.
    pub async fn query(&self, text: &str) -> QueryResponse {
        let terms = extract_search_terms(text);
        debug!(query = text, terms = %terms, "extracted search terms");
        if terms.is_empty() {
            info!(query = text, "query has no search terms");
        }

        match self.search(&terms).await {
            Ok(hits) => {
                info!(terms = %terms, hits = hits.len(), "query answered");
                QueryResponse::from_patents(hits.iter().map(project).collect())
            }
            Err(e) => {
                warn!(terms = %terms, error = %e, "query failed");
                QueryResponse::failed(e.to_string())
            }
        }
    }

    /// Diagnostic search of `patent_abstract` for a raw term, bypassing
    /// term extraction.
    pub async fn direct_query(&self, term: Option<&str>) -> DirectQueryResponse {
        let term = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DIRECT_TERM);

        match self.run_search(term.to_string(), &["patent_abstract"]).await {
            Ok(hits) => {
                let sample = hits
                    .first()
                    .map(|hit| json!({"_id": hit.id, "_source": hit.source}))
                    .unwrap_or_else(|| json!({}));
                DirectQueryResponse {
                    success: true,
                    hit_count: Some(hits.len()),
                    sample: Some(sample),
                    error: None,
                }
            }
            Err(e) => {
                warn!(term, error = %e, "direct query failed");
                DirectQueryResponse {
                    success: false,
                    hit_count: None,
                    sample: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Whether the search collection can be reached, with its document count
    pub async fn health(&self) -> HealthStatus {
        let collection = self.collection.clone();
        let counted = call_with_timeout(&self.store, self.config.store_timeout(), move |store| {
            store.count(&collection)
        })
        .await;

        match counted {
            Ok(documents) => HealthStatus {
                status: "ok",
                collection: self.collection.clone(),
                documents: Some(documents),
                error: None,
            },
            Err(e) => HealthStatus {
                status: "unavailable",
                collection: self.collection.clone(),
                documents: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::composite_schema;
    use crate::store::{Record, RefreshPolicy, SqliteStore};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn create_test_store() -> Arc<dyn StagingStore> {
        let store: Arc<dyn StagingStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.create_collection(TARGET_COLLECTION, &composite_schema()).unwrap();
        store
            .bulk_write(
                TARGET_COLLECTION,
                vec![
                    record(json!({
                        "patent_id": "1",
                        "patent_title": "Hydrocarbon cracking",
                        "patent_date": "2015-03-01",
                        "patent_abstract": "A process for cracking hydrocarbon feedstock",
                        "cpc_classes": [{"cpc_section": "C", "cpc_class": "C10"}],
                        "people": [{"patent_id": "1", "inventor_full_name": "Jane Doe", "inventor_id": "i1"}]
                    })),
                    record(json!({
                        "patent_id": "2",
                        "patent_title": "Solar roof",
                        "patent_date": "2018-06-01",
                        "patent_abstract": "Photovoltaic tiles",
                        "summary": "Roof tiles that hold hydrocarbon resistant coatings",
                        "cpc_classes": [{"cpc_section": "H", "cpc_class": "H02"}],
                        "people": [{"patent_id": "2", "inventor_full_name": "Jane Doe", "inventor_id": "i1"}]
                    })),
                    record(json!({
                        "patent_id": "3",
                        "patent_title": "Bicycle frame",
                        "patent_date": "2001-01-01",
                        "patent_abstract": "A lightweight frame"
                    })),
                ],
                RefreshPolicy::Wait,
            )
            .unwrap();
        store
    }

    fn service(store: &Arc<dyn StagingStore>) -> QueryService {
        QueryService::new(Arc::clone(store), QueryConfig::default())
    }

    #[tokio::test]
    async fn query_aggregates_matching_patents() {
        let store = create_test_store();
        let response = service(&store)
            .query("get me all patents with the word hydrocarbon")
            .await;

        assert_eq!(response.error, None);
        assert_eq!(response.total_count, 2);
        let mut ids: Vec<&str> = response.patents.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);

        let years: Vec<&str> = response.timeline.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(years, vec!["2015", "2018"]);
        assert_eq!(response.inventors, vec![InventorCount { name: "Jane Doe".into(), count: 2 }]);
        assert_eq!(response.cpc_sections.iter().map(|s| s.count).sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn result_cap_bounds_hits() {
        let store = create_test_store();
        let service = QueryService::new(
            Arc::clone(&store),
            QueryConfig {
                result_cap: 1,
                ..Default::default()
            },
        );
        assert_eq!(service.query("hydrocarbon").await.total_count, 1);
    }

    #[tokio::test]
    async fn stopword_only_query_matches_nothing() {
        let store = create_test_store();
        let response = service(&store).query("get me all the").await;
        assert_eq!(response.total_count, 0);
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn missing_collection_degrades_to_stable_shape() {
        let store: Arc<dyn StagingStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let response = service(&store).query("hydrocarbon").await;

        assert!(response.error.is_some());
        assert_eq!(response.total_count, 0);
        assert!(response.patents.is_empty());
        assert!(response.timeline.is_empty());

        let value = serde_json::to_value(&response).unwrap();
        for key in ["total_count", "patents", "timeline", "cpc_sections", "inventors", "error", "message"] {
            assert!(value.get(key).is_some(), "{key}");
        }
    }

    #[tokio::test]
    async fn direct_query_searches_abstract_only() {
        let store = create_test_store();
        let response = service(&store).direct_query(None).await;

        assert!(response.success);
        assert_eq!(response.hit_count, Some(1));
        let sample = response.sample.unwrap();
        assert_eq!(sample["_source"]["patent_id"], "1");
    }

    #[tokio::test]
    async fn direct_query_without_hits_has_empty_sample() {
        let store = create_test_store();
        let response = service(&store).direct_query(Some("zeppelin")).await;
        assert_eq!(response.hit_count, Some(0));
        assert_eq!(response.sample, Some(json!({})));
    }

    #[tokio::test]
    async fn health_reports_document_count() {
        let store = create_test_store();
        let health = service(&store).health().await;
        assert!(health.is_ok());
        assert_eq!(health.documents, Some(3));

        let empty: Arc<dyn StagingStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        assert!(!service(&empty).health().await.is_ok());
    }
}
