//! Staging store trait definitions

use super::schema::CollectionSchema;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// A stored document: a JSON object
pub type Record = serde_json::Map<String, Value>;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store unreachable: {0}")]
    Connectivity(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Visibility guarantee requested by a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Return as soon as the write is committed
    #[default]
    None,
    /// Block until the write is flushed and durable
    Wait,
}

/// Metadata about a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    /// Monotonically increasing across every collection the store creates.
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

/// A single record a bulk write did not commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemError {
    /// Position of the record in the submitted batch
    pub index: usize,
    /// Key of the record, when it had one
    pub key: Option<String>,
    pub reason: String,
}

/// Outcome of a bulk write
///
/// Partial success is the normal case: valid records commit even when
/// others in the same batch are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkWriteResult {
    pub success_count: usize,
    pub errors: Vec<BulkItemError>,
}

impl BulkWriteResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Warn about the first `limit` rejected records, then summarize the rest.
    pub fn log_rejections(&self, collection: &str, limit: usize) {
        for error in self.errors.iter().take(limit) {
            warn!(
                collection,
                index = error.index,
                key = ?error.key,
                reason = %error.reason,
                "record rejected"
            );
        }
        if self.errors.len() > limit {
            warn!(collection, more = self.errors.len() - limit, "further records rejected");
        }
    }
}

/// A full-text OR query over a set of fields
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Whitespace-separated terms; a document matches if any term matches
    pub terms: String,
    /// Fields to match against
    pub fields: Vec<String>,
    /// Maximum number of hits returned
    pub size: usize,
}

impl SearchRequest {
    pub fn new(terms: impl Into<String>, fields: &[&str], size: usize) -> Self {
        Self {
            terms: terms.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            size,
        }
    }
}

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub source: Record,
}

/// Lazy scan over every record of a collection
pub type RecordScan<'a> = Box<dyn Iterator<Item = StoreResult<Record>> + Send + 'a>;

/// Trait for staging store backends
///
/// Implementations must be thread-safe (Send + Sync) so a single handle can
/// be shared by parallel stagers and concurrent satellite lookups.
/// Collection names given to read operations may be aliases.
pub trait StagingStore: Send + Sync {
    // === Collection Operations ===

    /// Whether a collection (or alias) with this name exists
    fn index_exists(&self, name: &str) -> StoreResult<bool>;

    /// Create a collection, deleting any existing collection of the same name first
    fn create_collection(&self, name: &str, schema: &CollectionSchema) -> StoreResult<CollectionInfo>;

    /// Create a collection only if nothing of that name exists.
    ///
    /// Returns true if the collection was created.
    fn create_collection_if_absent(&self, name: &str, schema: &CollectionSchema) -> StoreResult<bool> {
        if self.index_exists(name)? {
            return Ok(false);
        }
        self.create_collection(name, schema)?;
        Ok(true)
    }

    /// Delete a collection and its documents
    fn delete_collection(&self, name: &str) -> StoreResult<bool>;

    /// List collections whose name starts with `prefix`
    fn list_collections(&self, prefix: &str) -> StoreResult<Vec<CollectionInfo>>;

    /// Point `alias` at `collection`, replacing any previous target
    fn put_alias(&self, alias: &str, collection: &str) -> StoreResult<()>;

    /// The collection an alias points at
    fn resolve_alias(&self, alias: &str) -> StoreResult<Option<String>>;

    // === Document Operations ===

    /// Validate and write a batch of records
    fn bulk_write(
        &self,
        collection: &str,
        records: Vec<Record>,
        refresh: RefreshPolicy,
    ) -> StoreResult<BulkWriteResult>;

    /// Records whose key field equals `key`, at most `limit`, in no particular order
    fn point_query(&self, collection: &str, key: &str, limit: usize) -> StoreResult<Vec<Record>>;

    /// Iterate every record of a collection
    fn scan<'a>(&'a self, collection: &str) -> StoreResult<RecordScan<'a>>;

    /// Full-text OR search
    fn search(&self, collection: &str, request: &SearchRequest) -> StoreResult<Vec<Hit>>;

    /// Number of documents in a collection
    fn count(&self, collection: &str) -> StoreResult<usize>;

    /// Make all prior writes to a collection durable and visible
    fn refresh(&self, collection: &str) -> StoreResult<()>;
}
