//! Staging store backends
//!
//! All pipeline stages talk to the backing store through the `StagingStore`
//! trait. The primary implementation is `SqliteStore`.

mod blocking;
mod schema;
mod sqlite;
mod traits;

pub use blocking::{call_to_completion, call_with_timeout};
pub use schema::{parse_date, CollectionSchema, FieldSpec, FieldType};
pub use sqlite::SqliteStore;
pub use traits::{
    BulkItemError, BulkWriteResult, CollectionInfo, Hit, Record, RecordScan, RefreshPolicy,
    SearchRequest, StagingStore, StoreError, StoreResult,
};
