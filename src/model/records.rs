//! Typed staging records
//!
//! One struct per entity kind. Field names are the stored JSON keys.

use crate::store::Record;
use serde::{Deserialize, Serialize};

/// Core patent metadata; the source of truth for which patents exist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibliographicRecord {
    pub patent_id: String,
    pub patent_title: String,
    /// `YYYY-MM-DD`, absent when the input had no parseable date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patent_date: Option<String>,
    pub patent_abstract: String,
    pub num_claims: i64,
    pub patent_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimRecord {
    pub patent_id: String,
    pub claim_sequence: i64,
    pub claim_text: String,
    pub dependent: bool,
    pub claim_number: i64,
    pub exemplary: bool,
}

/// A citation; granted-patent and application citations share this shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationRecord {
    pub patent_id: String,
    pub citation_sequence: i64,
    pub citation_document_number: String,
    pub citation_date: Option<String>,
    pub record_name: String,
    pub wipo_kind: String,
    pub citation_category: String,
}

/// Applicant, assignee and inventor fields attached to a patent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonRecord {
    pub patent_id: String,
    pub applicant_authority: String,
    pub applicant_organization: String,
    pub applicant_full_name: String,
    pub assignee_id: String,
    pub assignee_organization: String,
    pub assignee_full_name: String,
    pub inventor_id: String,
    pub gender_code: String,
    pub inventor_full_name: String,
}

/// CPC classification of a patent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRecord {
    pub patent_id: String,
    pub cpc_section: String,
    pub cpc_class: String,
    pub cpc_subclass: String,
    pub cpc_group: String,
    pub cpc_type: String,
    pub cpc_group_title: String,
    pub cpc_class_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryRecord {
    pub patent_id: String,
    pub summary: String,
}

/// Convert a typed record into a storable JSON object.
pub fn to_record<T: Serialize>(value: &T) -> serde_json::Result<Record> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Read a stored JSON object back into a typed record.
pub fn from_record<T: for<'de> Deserialize<'de>>(record: Record) -> serde_json::Result<T> {
    serde_json::from_value(serde_json::Value::Object(record))
}
