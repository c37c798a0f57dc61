//! Ingest pipeline: stage the given inputs, then denormalize

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::denormalize::{DenormError, DenormReport, DenormalizationEngine};
use crate::model::{EntityKind, BIBLIOGRAPHIC_ALIAS, BIBLIOGRAPHIC_GENERATION_PREFIX};
use crate::staging::{run_stagers, StageReport};
use crate::store::{call_with_timeout, StagingStore, StoreResult};

/// Input file per entity kind; kinds without a file are not staged
#[derive(Debug, Clone, Default)]
pub struct IngestInputs {
    pub patent: Option<PathBuf>,
    pub us_citation: Option<PathBuf>,
    pub us_app_citation: Option<PathBuf>,
    pub classes: Option<PathBuf>,
    pub people: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub claim: Option<PathBuf>,
}

impl IngestInputs {
    /// Selected inputs in staging order
    pub fn selected(&self) -> Vec<(EntityKind, PathBuf)> {
        [
            (EntityKind::Bibliographic, &self.patent),
            (EntityKind::Claims, &self.claim),
            (EntityKind::UsCitations, &self.us_citation),
            (EntityKind::UsAppCitations, &self.us_app_citation),
            (EntityKind::People, &self.people),
            (EntityKind::Classifications, &self.classes),
            (EntityKind::Summaries, &self.summary),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.clone().map(|p| (kind, p)))
        .collect()
    }
}

/// A stager outcome as reported by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Staged(StageReport),
    Failed { kind: EntityKind, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
    /// `None` when denormalization was skipped
    pub denormalization: Option<DenormReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denormalization_error: Option<String>,
}

impl PipelineReport {
    /// True when every stager and the denormalization (if run) succeeded
    pub fn is_success(&self) -> bool {
        self.denormalization_error.is_none()
            && self
                .denormalization
                .as_ref()
                .map_or(true, DenormReport::is_complete)
            && self
                .stages
                .iter()
                .all(|s| matches!(s, StageOutcome::Staged(_)))
    }
}

fn bibliographic_source_exists(store: &dyn StagingStore) -> StoreResult<bool> {
    Ok(store.index_exists(BIBLIOGRAPHIC_ALIAS)?
        || !store.list_collections(BIBLIOGRAPHIC_GENERATION_PREFIX)?.is_empty())
}

/// Stage every selected input in parallel, then denormalize when bibliographic
/// records were staged now or by an earlier run.
pub async fn run_pipeline(
    store: Arc<dyn StagingStore>,
    inputs: &IngestInputs,
    config: &Config,
) -> PipelineReport {
    let selected = inputs.selected();
    info!(inputs = selected.len(), "ingest started");

    let results = run_stagers(Arc::clone(&store), selected, config.staging.clone()).await;
    let bibliographic_staged = results
        .iter()
        .any(|(kind, result)| *kind == EntityKind::Bibliographic && result.is_ok());
    let stages = results
        .into_iter()
        .map(|(kind, result)| match result {
            Ok(report) => StageOutcome::Staged(report),
            Err(e) => StageOutcome::Failed {
                kind,
                error: e.to_string(),
            },
        })
        .collect();

    let mut report = PipelineReport {
        stages,
        denormalization: None,
        denormalization_error: None,
    };

    let source_exists = bibliographic_staged
        || call_with_timeout(
            &store,
            config.denormalize.store_timeout(),
            bibliographic_source_exists,
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "could not check for a bibliographic collection");
            false
        });

    if !source_exists {
        info!("no bibliographic records staged; skipping denormalization");
        return report;
    }

    let engine = DenormalizationEngine::new(store, config.denormalize.clone());
    match engine.run().await {
        Ok(denorm) => report.denormalization = Some(denorm),
        Err(DenormError::NoBibliographicSource) => {
            info!("no bibliographic records staged; skipping denormalization");
        }
        Err(e) => {
            warn!(error = %e, "denormalization failed");
            report.denormalization_error = Some(e.to_string());
        }
    }
    report
}
