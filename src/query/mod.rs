//! Query and aggregation service
//!
//! Turns a natural-language query into a bounded multi-field search over the
//! composite collection, projects the hits into a stable shape, and computes
//! the timeline, CPC section histogram, and inventor ranking.

pub mod aggregate;
pub mod projection;
mod service;
pub mod terms;

pub use aggregate::{
    aggregate_classification_histogram, aggregate_inventor_ranking, aggregate_timeline,
    InventorCount, SectionCount, YearCount,
};
pub use projection::{project, InventorRef, PatentView};
pub use service::{
    DirectQueryResponse, HealthStatus, QueryResponse, QueryService, DEFAULT_DIRECT_TERM,
    SEARCH_FIELDS,
};
pub use terms::{extract_search_terms, STOPWORDS};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type QueryResult<T> = Result<T, QueryError>;
