//! Patent data model: staged records, composite documents, collection layout

mod collections;
mod document;
mod fields;
mod records;

pub use collections::{
    composite_schema, EntityKind, BIBLIOGRAPHIC_ALIAS, BIBLIOGRAPHIC_GENERATION_PREFIX,
    TARGET_COLLECTION,
};
pub use document::{CitationEntry, ClaimEntry, ClassificationEntry, ComposedPatentDocument};
pub use fields::{ClassificationCodes, PatentDate};
pub use records::{
    from_record, to_record, BibliographicRecord, CitationRecord, ClaimRecord, ClassificationRecord,
    PersonRecord, SummaryRecord,
};
