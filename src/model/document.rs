//! The composite per-patent search document

use super::records::{BibliographicRecord, PersonRecord};
use serde::{Deserialize, Serialize};

/// A claim as nested in a composite document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimEntry {
    pub claim_sequence: i64,
    pub claim_text: String,
    pub dependent: bool,
    pub claim_number: i64,
    pub exemplary: bool,
}

/// A citation as nested in a composite document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationEntry {
    pub citation_sequence: i64,
    pub citation_document_number: String,
    pub citation_date: Option<String>,
    pub record_name: String,
    pub wipo_kind: String,
    pub citation_category: String,
}

/// A CPC classification as nested in a composite document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationEntry {
    pub cpc_section: String,
    pub cpc_class: String,
    pub cpc_subclass: String,
    pub cpc_group: String,
    pub cpc_type: String,
    pub cpc_group_title: String,
    pub cpc_class_title: String,
}

/// Bibliographic fields plus every satellite facet of one patent.
///
/// Facets with no matching rows are empty arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposedPatentDocument {
    #[serde(flatten)]
    pub bibliographic: BibliographicRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub claims: Vec<ClaimEntry>,
    /// Claim texts joined by single spaces, in the order claims were looked up
    pub claims_text: String,
    pub people: Vec<PersonRecord>,
    pub cpc_classes: Vec<ClassificationEntry>,
    pub us_citations: Vec<CitationEntry>,
    pub us_app_citations: Vec<CitationEntry>,
}

impl ComposedPatentDocument {
    /// A document with no facets yet
    pub fn new(bibliographic: BibliographicRecord) -> Self {
        Self {
            bibliographic,
            ..Default::default()
        }
    }

    pub fn patent_id(&self) -> &str {
        &self.bibliographic.patent_id
    }

    /// Set the claims facet and derive `claims_text` from it.
    pub fn set_claims(&mut self, claims: Vec<ClaimEntry>) {
        self.claims_text = claims
            .iter()
            .map(|c| c.claim_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.claims = claims;
    }
}
