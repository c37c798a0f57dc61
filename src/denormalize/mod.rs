//! Denormalization engine
//!
//! Joins the staged satellite collections onto each bibliographic record and
//! writes one composite document per patent into the search collection.

mod engine;
pub mod facets;

pub use engine::{DenormReport, DenormalizationEngine};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenormError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No bibliographic staging collection found (alias or generation)")]
    NoBibliographicSource,
}

pub type DenormResult<T> = Result<T, DenormError>;
