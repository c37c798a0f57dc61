//! Stager driver: read → map → rebuild collection → bulk write

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::mappers::{mapper_for, SkipReason};
use super::reader::ChunkedReader;
use super::{StageError, StageResult};
use crate::config::StagingConfig;
use crate::model::{EntityKind, BIBLIOGRAPHIC_ALIAS, BIBLIOGRAPHIC_GENERATION_PREFIX};
use crate::store::{RefreshPolicy, StagingStore};

/// Per-item write errors logged for each chunk before the rest are only counted
const LOGGED_WRITE_ERRORS: usize = 5;

/// Outcome of one stager run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub kind: EntityKind,
    /// Concrete collection written (a generation name for bibliographic records)
    pub collection: String,
    pub rows_read: usize,
    pub records_written: usize,
    /// Rows that parsed but failed a required-field check or were duplicates
    pub rows_skipped: usize,
    /// Rows the CSV reader could not decode
    pub malformed_rows: usize,
    pub write_errors: usize,
    /// Generation number of the collection created by this run
    pub generation: u64,
}

/// Tab for summaries and `.tsv` files, comma otherwise
pub fn delimiter_for(kind: EntityKind, path: &Path) -> u8 {
    let is_tsv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
    if kind == EntityKind::Summaries || is_tsv {
        b'\t'
    } else {
        b','
    }
}

/// Stage one input file into the collection for `kind`.
///
/// Header validation happens before the existing collection is touched, so a
/// file with missing columns leaves the previous staging data in place.
pub fn stage_file(
    store: &dyn StagingStore,
    kind: EntityKind,
    path: &Path,
    config: &StagingConfig,
) -> StageResult<StageReport> {
    let mut reader = ChunkedReader::open(path, delimiter_for(kind, path), config.chunk_size)?;
    let mut mapper = mapper_for(kind);

    let required = mapper.required_columns();
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    let missing = reader.header().missing(&required);
    if !missing.is_empty() {
        return Err(StageError::MissingColumns {
            kind,
            columns: missing,
        });
    }

    let (collection, generation) = rebuild_collection(store, kind)?;
    info!(%kind, collection = %collection, path = %path.display(), "staging started");

    let mut report = StageReport {
        kind,
        collection: collection.clone(),
        rows_read: 0,
        records_written: 0,
        rows_skipped: 0,
        malformed_rows: 0,
        write_errors: 0,
        generation,
    };

    while let Some(chunk) = reader.next_chunk()? {
        report.malformed_rows += chunk.malformed;
        report.rows_read += chunk.rows.len();

        let mut records = Vec::with_capacity(chunk.rows.len());
        for row in &chunk.rows {
            match mapper.map_row(&reader.row(row), &config.defaults) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    if reason == SkipReason::Unserializable {
                        warn!(%kind, "row could not be serialized");
                    }
                    report.rows_skipped += 1;
                }
            }
        }

        if records.is_empty() {
            continue;
        }
        let result = store.bulk_write(&collection, records, RefreshPolicy::Wait)?;
        result.log_rejections(&collection, LOGGED_WRITE_ERRORS);
        report.records_written += result.success_count;
        report.write_errors += result.errors.len();
        debug!(%kind, written = report.records_written, "chunk staged");
    }

    if kind == EntityKind::Bibliographic {
        store.put_alias(BIBLIOGRAPHIC_ALIAS, &collection)?;
        prune_generations(store, &collection, config.generations_kept)?;
    }

    info!(
        %kind,
        rows_read = report.rows_read,
        written = report.records_written,
        skipped = report.rows_skipped,
        malformed = report.malformed_rows,
        write_errors = report.write_errors,
        "staging finished"
    );
    Ok(report)
}

/// Delete-then-create the staging collection.
///
/// Bibliographic records always go to a fresh generation; the alias is only
/// repointed once the whole file has been written.
fn rebuild_collection(store: &dyn StagingStore, kind: EntityKind) -> StageResult<(String, u64)> {
    let name = match kind {
        EntityKind::Bibliographic => format!(
            "{}{}",
            BIBLIOGRAPHIC_GENERATION_PREFIX,
            Utc::now().format("%Y%m%d%H%M%S%3f")
        ),
        _ => kind.collection().to_string(),
    };

    if kind != EntityKind::Bibliographic && store.delete_collection(&name)? {
        debug!(collection = %name, "deleted previous staging collection");
    }
    let info = store.create_collection(&name, &kind.schema())?;
    Ok((info.name, info.generation))
}

/// Keep the newest `keep` bibliographic generations, never dropping `current`.
fn prune_generations(store: &dyn StagingStore, current: &str, keep: usize) -> StageResult<()> {
    let mut generations = store.list_collections(BIBLIOGRAPHIC_GENERATION_PREFIX)?;
    generations.sort_by(|a, b| b.generation.cmp(&a.generation));

    for stale in generations.iter().skip(keep.max(1)) {
        if stale.name == current {
            continue;
        }
        store.delete_collection(&stale.name)?;
        info!(collection = %stale.name, "pruned bibliographic generation");
    }
    Ok(())
}

/// Run the given stagers in parallel on blocking threads.
///
/// Results come back in `EntityKind::ALL` order regardless of completion order.
pub async fn run_stagers(
    store: Arc<dyn StagingStore>,
    inputs: Vec<(EntityKind, PathBuf)>,
    config: StagingConfig,
) -> Vec<(EntityKind, StageResult<StageReport>)> {
    let config = Arc::new(config);
    let mut set = JoinSet::new();

    for (kind, path) in inputs {
        let store = Arc::clone(&store);
        let config = Arc::clone(&config);
        set.spawn(async move {
            let result =
                tokio::task::spawn_blocking(move || stage_file(store.as_ref(), kind, &path, &config))
                    .await
                    .unwrap_or_else(|e| Err(StageError::Aborted(e.to_string())));
            (kind, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((kind, result)) => {
                if let Err(e) = &result {
                    warn!(%kind, error = %e, "stager failed");
                }
                results.push((kind, result));
            }
            Err(e) => warn!(error = %e, "stager task did not complete"),
        }
    }

    results.sort_by_key(|(kind, _)| EntityKind::ALL.iter().position(|k| k == kind));
    results
}
