//! Row → record mapping, one mapper per entity kind

use std::collections::HashSet;

use super::cleaning::{clean_string, normalize_date, normalize_free_text};
use super::reader::Row;
use crate::config::DefaultPolicy;
use crate::model::{
    to_record, BibliographicRecord, CitationRecord, ClaimRecord, ClassificationRecord, EntityKind,
    PersonRecord, SummaryRecord,
};
use crate::store::Record;

/// Why a row produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingPatentId,
    EmptySummary,
    /// A row for the same key was already accepted this run
    Duplicate,
    Unserializable,
}

/// Maps cleaned rows of one input file to staging records
pub trait RowMapper: Send {
    fn kind(&self) -> EntityKind;

    /// Columns that must appear in the header
    fn required_columns(&self) -> Vec<String>;

    fn map_row(&mut self, row: &Row<'_>, policy: &DefaultPolicy) -> Result<Record, SkipReason>;
}

/// Build the mapper for an entity kind
pub fn mapper_for(kind: EntityKind) -> Box<dyn RowMapper> {
    match kind {
        EntityKind::Bibliographic => Box::new(BibliographicMapper),
        EntityKind::Claims => Box::new(ClaimMapper),
        EntityKind::UsCitations => Box::new(CitationMapper::new(EntityKind::UsCitations, "US_citation_")),
        EntityKind::UsAppCitations => {
            Box::new(CitationMapper::new(EntityKind::UsAppCitations, "US_app_citation_"))
        }
        EntityKind::People => Box::new(PersonMapper),
        EntityKind::Classifications => Box::new(ClassificationMapper),
        EntityKind::Summaries => Box::new(SummaryMapper::default()),
    }
}

fn patent_id(row: &Row<'_>) -> Result<String, SkipReason> {
    let id = clean_string(row.get("patent_id"));
    if id.is_empty() {
        return Err(SkipReason::MissingPatentId);
    }
    Ok(id)
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<Record, SkipReason> {
    to_record(value).map_err(|_| SkipReason::Unserializable)
}

pub struct BibliographicMapper;

impl RowMapper for BibliographicMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Bibliographic
    }

    fn required_columns(&self) -> Vec<String> {
        columns(&[
            "patent_id",
            "patent_title",
            "patent_date",
            "num_claims",
            "patent_type",
            "patent_abstract",
        ])
    }

    fn map_row(&mut self, row: &Row<'_>, policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        serialize(&BibliographicRecord {
            patent_id: patent_id(row)?,
            patent_title: clean_string(row.get("patent_title")),
            patent_date: normalize_date(row.get("patent_date")),
            patent_abstract: clean_string(row.get("patent_abstract")),
            num_claims: policy.parse_int(row.get("num_claims")),
            patent_type: clean_string(row.get("patent_type")),
        })
    }
}

pub struct ClaimMapper;

impl RowMapper for ClaimMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Claims
    }

    fn required_columns(&self) -> Vec<String> {
        columns(&[
            "patent_id",
            "claim_sequence",
            "claim_text",
            "dependent",
            "claim_number",
            "exemplary",
        ])
    }

    fn map_row(&mut self, row: &Row<'_>, policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        serialize(&ClaimRecord {
            patent_id: patent_id(row)?,
            claim_sequence: policy.parse_int(row.get("claim_sequence")),
            claim_text: clean_string(row.get("claim_text")),
            dependent: policy.parse_bool(row.get("dependent")),
            claim_number: policy.parse_int(row.get("claim_number")),
            exemplary: policy.parse_bool(row.get("exemplary")),
        })
    }
}

/// Citation rows carry prefixed column names (`US_citation_wipo_kind`, ...)
/// and are deduplicated by `(patent_id, citation_document_number)`.
pub struct CitationMapper {
    kind: EntityKind,
    prefix: &'static str,
    seen: HashSet<(String, String)>,
}

impl CitationMapper {
    pub fn new(kind: EntityKind, prefix: &'static str) -> Self {
        Self {
            kind,
            prefix,
            seen: HashSet::new(),
        }
    }

    fn column(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn cell<'a>(&self, row: &Row<'a>, name: &str) -> Option<&'a str> {
        row.get(&self.column(name))
    }
}

const CITATION_COLUMNS: [&str; 6] = [
    "citation_sequence",
    "citation_document_number",
    "citation_date",
    "record_name",
    "wipo_kind",
    "citation_category",
];

impl RowMapper for CitationMapper {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn required_columns(&self) -> Vec<String> {
        let mut required = vec!["patent_id".to_string()];
        required.extend(CITATION_COLUMNS.iter().map(|c| self.column(c)));
        required
    }

    fn map_row(&mut self, row: &Row<'_>, policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        let patent_id = patent_id(row)?;
        let document_number = clean_string(self.cell(row, "citation_document_number"));
        if !self.seen.insert((patent_id.clone(), document_number.clone())) {
            return Err(SkipReason::Duplicate);
        }

        serialize(&CitationRecord {
            patent_id,
            citation_sequence: policy.parse_int(self.cell(row, "citation_sequence")),
            citation_document_number: document_number,
            citation_date: normalize_date(self.cell(row, "citation_date")),
            record_name: clean_string(self.cell(row, "record_name")),
            wipo_kind: clean_string(self.cell(row, "wipo_kind")),
            citation_category: clean_string(self.cell(row, "citation_category")),
        })
    }
}

/// People files vary in which columns they carry; only `patent_id` is required.
pub struct PersonMapper;

impl RowMapper for PersonMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::People
    }

    fn required_columns(&self) -> Vec<String> {
        columns(&["patent_id"])
    }

    fn map_row(&mut self, row: &Row<'_>, _policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        serialize(&PersonRecord {
            patent_id: patent_id(row)?,
            applicant_authority: clean_string(row.get("applicant_authority")),
            applicant_organization: clean_string(row.get("applicant_organization")),
            applicant_full_name: clean_string(row.get("applicant_full_name")),
            assignee_id: clean_string(row.get("assignee_id")),
            assignee_organization: clean_string(row.get("assignee_organization")),
            assignee_full_name: clean_string(row.get("assignee_full_name")),
            inventor_id: clean_string(row.get("inventor_id")),
            gender_code: clean_string(row.get("gender_code")),
            inventor_full_name: clean_string(row.get("inventor_full_name")),
        })
    }
}

pub struct ClassificationMapper;

impl RowMapper for ClassificationMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Classifications
    }

    fn required_columns(&self) -> Vec<String> {
        columns(&[
            "patent_id",
            "cpc_section",
            "cpc_class",
            "cpc_subclass",
            "cpc_group",
            "cpc_type",
            "cpc_group_title",
            "cpc_class_title",
        ])
    }

    fn map_row(&mut self, row: &Row<'_>, _policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        serialize(&ClassificationRecord {
            patent_id: patent_id(row)?,
            cpc_section: clean_string(row.get("cpc_section")),
            cpc_class: clean_string(row.get("cpc_class")),
            cpc_subclass: clean_string(row.get("cpc_subclass")),
            cpc_group: clean_string(row.get("cpc_group")),
            cpc_type: clean_string(row.get("cpc_type")),
            cpc_group_title: clean_string(row.get("cpc_group_title")),
            cpc_class_title: clean_string(row.get("cpc_class_title")),
        })
    }
}

/// Keeps the first non-empty summary seen for each patent.
#[derive(Default)]
pub struct SummaryMapper {
    seen: HashSet<String>,
}

impl RowMapper for SummaryMapper {
    fn kind(&self) -> EntityKind {
        EntityKind::Summaries
    }

    fn required_columns(&self) -> Vec<String> {
        columns(&["patent_id", "summary_text"])
    }

    fn map_row(&mut self, row: &Row<'_>, _policy: &DefaultPolicy) -> Result<Record, SkipReason> {
        let patent_id = patent_id(row)?;
        let summary = normalize_free_text(row.get("summary_text"));
        if summary.is_empty() {
            return Err(SkipReason::EmptySummary);
        }
        if self.seen.contains(&patent_id) {
            return Err(SkipReason::Duplicate);
        }
        self.seen.insert(patent_id.clone());

        serialize(&SummaryRecord { patent_id, summary })
    }
}
