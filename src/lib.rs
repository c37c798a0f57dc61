//! Patent Search: denormalizing patent datasets for faceted search
//!
//! Independently staged patent datasets (bibliographic records, claims,
//! citations, people, CPC classifications, summaries) are joined into one
//! composite document per patent, which natural-language queries then search
//! and aggregate.
//!
//! # Stages
//!
//! - **Staging**: chunked CSV/TSV readers rebuild one staging collection per entity kind
//! - **Denormalization**: every bibliographic record is joined with its satellite rows
//! - **Query**: a bounded OR search plus timeline, CPC histogram, and inventor ranking
//!
//! # Example
//!
//! ```
//! use patent_search::extract_search_terms;
//!
//! let terms = extract_search_terms("get me all patents with the word hydrocarbon");
//! assert_eq!(terms, "patents hydrocarbon");
//! ```

pub mod config;
pub mod denormalize;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod staging;
pub mod store;

pub use config::{Config, ConfigError};
pub use denormalize::{DenormError, DenormReport, DenormalizationEngine};
pub use model::{ComposedPatentDocument, EntityKind, TARGET_COLLECTION};
pub use pipeline::{run_pipeline, IngestInputs, PipelineReport};
pub use query::{extract_search_terms, QueryError, QueryResponse, QueryService};
pub use staging::{run_stagers, StageError, StageReport};
pub use store::{SqliteStore, StagingStore, StoreError, StoreResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
