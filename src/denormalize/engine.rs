//! Scan → fan-out lookups → compose → batched writes

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::facets::{compose, lookup_cap, SATELLITES};
use super::{DenormError, DenormResult};
use crate::config::DenormalizeConfig;
use crate::model::{
    composite_schema, from_record, to_record, BibliographicRecord, EntityKind,
    BIBLIOGRAPHIC_ALIAS, BIBLIOGRAPHIC_GENERATION_PREFIX, TARGET_COLLECTION,
};
use crate::store::{
    call_to_completion, call_with_timeout, Record, RefreshPolicy, StagingStore, StoreError,
    StoreResult,
};

/// Scanned records buffered ahead of composition
const SCAN_BUFFER: usize = 256;

/// Rejected records logged per batch
const LOGGED_WRITE_ERRORS: usize = 5;

/// Outcome of one denormalization run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DenormReport {
    /// Concrete bibliographic collection that was scanned
    pub source_collection: String,
    pub target_collection: String,
    /// Satellite kinds whose collections existed when the run started
    pub satellites: Vec<EntityKind>,
    pub composed: usize,
    /// Bibliographic records that could not be decoded or had no patent id
    pub skipped_records: usize,
    pub written: usize,
    pub write_errors: usize,
    pub batches_written: usize,
    pub failed_batches: usize,
    /// Satellite lookups that failed or timed out, leaving a facet empty
    pub degraded_lookups: usize,
    /// Set when the bibliographic scan stopped early; counts cover the
    /// records read before it stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

#[derive(Debug, Default)]
struct FlushOutcome {
    written: usize,
    write_errors: usize,
    attempted: bool,
    failed: bool,
}

impl DenormReport {
    /// True when every bibliographic record was read
    pub fn is_complete(&self) -> bool {
        self.scan_error.is_none()
    }

    fn absorb_flush(&mut self, flush: FlushOutcome) {
        self.written += flush.written;
        self.write_errors += flush.write_errors;
        if flush.attempted {
            self.batches_written += 1;
        }
        if flush.failed {
            self.failed_batches += 1;
        }
    }
}

/// Builds composite documents from the staged collections
///
/// The store handle is shared; the engine holds no other state between runs.
pub struct DenormalizationEngine {
    store: Arc<dyn StagingStore>,
    config: DenormalizeConfig,
}

/// State shared by the lookup tasks of one run
struct RunContext {
    store: Arc<dyn StagingStore>,
    config: DenormalizeConfig,
    satellites: Vec<EntityKind>,
    lookups: Arc<Semaphore>,
}

/// A composed record ready for the batch, or why there is none
struct Composed {
    record: Option<Record>,
    degraded_lookups: usize,
}

impl DenormalizationEngine {
    pub fn new(store: Arc<dyn StagingStore>, config: DenormalizeConfig) -> Self {
        Self { store, config }
    }

    async fn call<T, F>(&self, call: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StagingStore) -> StoreResult<T> + Send + 'static,
    {
        call_with_timeout(&self.store, self.config.store_timeout(), call).await
    }

    /// Find the bibliographic collection to scan.
    ///
    /// The alias wins when present. Otherwise the generation with the highest
    /// generation number is chosen and the alias is pointed at it.
    pub async fn resolve_source(&self) -> DenormResult<String> {
        self.call(resolve_bibliographic_source)
            .await?
            .ok_or(DenormError::NoBibliographicSource)
    }

    /// Create the target collection if it does not exist yet.
    ///
    /// Existing composites are kept and overwritten by `patent_id` on write.
    pub async fn ensure_target(&self) -> DenormResult<bool> {
        let created = self
            .call(|store| store.create_collection_if_absent(TARGET_COLLECTION, &composite_schema()))
            .await?;
        if created {
            info!(collection = TARGET_COLLECTION, "created target collection");
        }
        Ok(created)
    }

    /// Satellite kinds whose staging collections exist
    async fn available_satellites(&self) -> DenormResult<Vec<EntityKind>> {
        let satellites = self
            .call(|store| {
                let mut present = Vec::new();
                for kind in SATELLITES {
                    if store.index_exists(kind.collection())? {
                        present.push(kind);
                    }
                }
                Ok(present)
            })
            .await?;

        for kind in SATELLITES.iter().filter(|k| !satellites.contains(k)) {
            info!(%kind, collection = kind.collection(), "satellite collection missing; facet will be empty");
        }
        Ok(satellites)
    }

    /// Run one full denormalization pass.
    pub async fn run(&self) -> DenormResult<DenormReport> {
        let source = self.resolve_source().await?;
        self.ensure_target().await?;
        let satellites = self.available_satellites().await?;
        info!(source = %source, satellites = satellites.len(), "denormalization started");

        let mut report = DenormReport {
            source_collection: source.clone(),
            target_collection: TARGET_COLLECTION.to_string(),
            satellites: satellites.clone(),
            ..Default::default()
        };

        let ctx = Arc::new(RunContext {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            satellites,
            lookups: Arc::new(Semaphore::new(self.config.max_in_flight_lookups.max(1))),
        });

        let (tx, mut rx) = mpsc::channel::<StoreResult<Record>>(SCAN_BUFFER);
        let scan_store = Arc::clone(&self.store);
        let scan_source = source.clone();
        let scanner = tokio::task::spawn_blocking(move || {
            let scan = match scan_store.scan(&scan_source) {
                Ok(scan) => scan,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    return;
                }
            };
            for item in scan {
                // Receiver gone means the run was abandoned
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });

        // Records are composed one at a time in scan order, so batch contents
        // follow the scan; only the lookups of a single record run concurrently.
        let mut batch = Vec::with_capacity(self.config.batch_size);
        while let Some(item) = rx.recv().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    warn!(source = %source, composed = report.composed, error = %e, "scan of bibliographic collection failed");
                    report.scan_error = Some(e.to_string());
                    break;
                }
            };

            let composed = Arc::clone(&ctx).compose_record(record).await;
            report.degraded_lookups += composed.degraded_lookups;
            let Some(record) = composed.record else {
                report.skipped_records += 1;
                continue;
            };
            report.composed += 1;
            batch.push(record);

            if batch.len() >= self.config.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.config.batch_size));
                report.absorb_flush(ctx.flush(full, RefreshPolicy::None).await);
            }
        }
        drop(rx);

        if let Err(e) = scanner.await {
            warn!(error = %e, "scan task did not complete");
            if report.scan_error.is_none() {
                report.scan_error = Some(e.to_string());
            }
        }

        // Written even after a scan failure so the records already read land
        report.absorb_flush(ctx.flush(batch, RefreshPolicy::Wait).await);

        info!(
            source = %report.source_collection,
            composed = report.composed,
            written = report.written,
            write_errors = report.write_errors,
            failed_batches = report.failed_batches,
            degraded_lookups = report.degraded_lookups,
            complete = report.is_complete(),
            "denormalization finished"
        );
        Ok(report)
    }
}

fn resolve_bibliographic_source(store: &dyn StagingStore) -> StoreResult<Option<String>> {
    if let Some(target) = store.resolve_alias(BIBLIOGRAPHIC_ALIAS)? {
        return Ok(Some(target));
    }
    // A concrete collection may carry the alias name itself
    if store.index_exists(BIBLIOGRAPHIC_ALIAS)? {
        return Ok(Some(BIBLIOGRAPHIC_ALIAS.to_string()));
    }

    let latest = store
        .list_collections(BIBLIOGRAPHIC_GENERATION_PREFIX)?
        .into_iter()
        .max_by_key(|info| info.generation);
    match latest {
        Some(info) => {
            store.put_alias(BIBLIOGRAPHIC_ALIAS, &info.name)?;
            info!(
                collection = %info.name,
                generation = info.generation,
                "alias missing; pointed it at the most recent generation"
            );
            Ok(Some(info.name))
        }
        None => Ok(None),
    }
}

impl RunContext {
    /// Look up every satellite facet of one bibliographic record and compose
    /// the document. Records without a usable `patent_id` compose to nothing.
    async fn compose_record(self: Arc<Self>, record: Record) -> Composed {
        let bibliographic = match from_record::<BibliographicRecord>(record) {
            Ok(b) if !b.patent_id.trim().is_empty() => b,
            Ok(_) => {
                debug!("bibliographic record without patent_id skipped");
                return Composed {
                    record: None,
                    degraded_lookups: 0,
                };
            }
            Err(e) => {
                warn!(error = %e, "undecodable bibliographic record skipped");
                return Composed {
                    record: None,
                    degraded_lookups: 0,
                };
            }
        };
        let patent_id = bibliographic.patent_id.clone();

        let mut lookups = JoinSet::new();
        for &kind in &self.satellites {
            let ctx = Arc::clone(&self);
            let id = patent_id.clone();
            lookups.spawn(async move { (kind, ctx.lookup(kind, id).await) });
        }

        let mut facets = Vec::with_capacity(self.satellites.len());
        let mut degraded_lookups = 0;
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((kind, Ok(rows))) => facets.push((kind, rows)),
                Ok((kind, Err(e))) => {
                    degraded_lookups += 1;
                    warn!(patent_id = %patent_id, %kind, error = %e, "satellite lookup failed; facet left empty");
                }
                Err(e) => {
                    degraded_lookups += 1;
                    warn!(patent_id = %patent_id, error = %e, "satellite lookup task did not complete");
                }
            }
        }

        let doc = compose(bibliographic, facets);
        match to_record(&doc) {
            Ok(record) => Composed {
                record: Some(record),
                degraded_lookups,
            },
            Err(e) => {
                warn!(patent_id = %patent_id, error = %e, "composite document could not be serialized");
                Composed {
                    record: None,
                    degraded_lookups,
                }
            }
        }
    }

    /// One satellite point-query. The permit moves into the blocking call,
    /// so a timed-out query still counts against the limit until it returns.
    async fn lookup(&self, kind: EntityKind, patent_id: String) -> StoreResult<Vec<Record>> {
        let permit = Arc::clone(&self.lookups)
            .acquire_owned()
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;
        let limit = lookup_cap(&self.config.caps, kind);
        call_with_timeout(&self.store, self.config.store_timeout(), move |store| {
            let rows = store.point_query(kind.collection(), &patent_id, limit);
            drop(permit);
            rows
        })
        .await
    }

    /// Write a batch to the target. An empty final batch still refreshes the
    /// target so earlier non-blocking writes become durable.
    async fn flush(&self, batch: Vec<Record>, refresh: RefreshPolicy) -> FlushOutcome {
        let timeout = self.config.store_timeout();
        if batch.is_empty() {
            if refresh == RefreshPolicy::Wait {
                let refreshed =
                    call_with_timeout(&self.store, timeout, |store| store.refresh(TARGET_COLLECTION)).await;
                if let Err(e) = refreshed {
                    warn!(collection = TARGET_COLLECTION, error = %e, "final refresh failed");
                }
            }
            return FlushOutcome::default();
        }

        let size = batch.len();
        // Awaited past the timeout; an abandoned write may still commit
        let written = call_to_completion(&self.store, timeout, move |store| {
            store.bulk_write(TARGET_COLLECTION, batch, refresh)
        })
        .await;

        match written {
            Ok(result) => {
                result.log_rejections(TARGET_COLLECTION, LOGGED_WRITE_ERRORS);
                debug!(size, written = result.success_count, ?refresh, "batch flushed");
                FlushOutcome {
                    written: result.success_count,
                    write_errors: result.errors.len(),
                    attempted: true,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(size, error = %e, "batch write failed; continuing");
                FlushOutcome {
                    written: 0,
                    write_errors: size,
                    attempted: true,
                    failed: true,
                }
            }
        }
    }
}
