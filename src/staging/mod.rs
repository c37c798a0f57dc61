//! Entity stagers
//!
//! Each stager reads one delimited input file, cleans its rows, and rebuilds
//! the staging collection for its entity kind. Stagers are independent: one
//! failing does not affect the others.

pub mod cleaning;
pub mod mappers;
pub mod reader;
mod stager;

pub use mappers::{mapper_for, RowMapper, SkipReason};
pub use stager::{delimiter_for, run_stagers, stage_file, StageReport};

use crate::model::EntityKind;
use crate::store::StoreError;
use thiserror::Error;

/// Errors fatal to a single stager
#[derive(Debug, Error)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{kind} input is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        kind: EntityKind,
        columns: Vec<String>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stager aborted: {0}")]
    Aborted(String),
}

pub type StageResult<T> = Result<T, StageError>;
