//! Collection names and schemas for every entity kind

use crate::store::{CollectionSchema, FieldSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias that always points at the current bibliographic generation
pub const BIBLIOGRAPHIC_ALIAS: &str = "patent_tmp";

/// Prefix of concrete bibliographic generations (`patent_tmp_<n>`)
pub const BIBLIOGRAPHIC_GENERATION_PREFIX: &str = "patent_tmp_";

/// The search collection holding composite documents
pub const TARGET_COLLECTION: &str = "patentsview";

/// One staged entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bibliographic,
    Claims,
    UsCitations,
    UsAppCitations,
    People,
    Classifications,
    Summaries,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Bibliographic,
        EntityKind::Claims,
        EntityKind::UsCitations,
        EntityKind::UsAppCitations,
        EntityKind::People,
        EntityKind::Classifications,
        EntityKind::Summaries,
    ];

    /// Name of the staging collection (the alias, for bibliographic records)
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Bibliographic => BIBLIOGRAPHIC_ALIAS,
            EntityKind::Claims => "claim_tmp",
            EntityKind::UsCitations => "us_citation_tmp",
            EntityKind::UsAppCitations => "us_app_citation_tmp",
            EntityKind::People => "patent_people_tmp",
            EntityKind::Classifications => "cpc_classes_tmp",
            EntityKind::Summaries => "summary_tmp",
        }
    }

    pub fn schema(&self) -> CollectionSchema {
        let fields = match self {
            EntityKind::Bibliographic => return bibliographic_schema(),
            EntityKind::Claims => claim_fields(),
            EntityKind::UsCitations | EntityKind::UsAppCitations => citation_fields(),
            EntityKind::People => person_fields(),
            EntityKind::Classifications => classification_fields(),
            EntityKind::Summaries => vec![FieldSpec::text("summary")],
        };
        let mut all = vec![FieldSpec::keyword("patent_id")];
        all.extend(fields);
        CollectionSchema::keyed_by("patent_id", all)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Bibliographic => "bibliographic",
            EntityKind::Claims => "claims",
            EntityKind::UsCitations => "us_citations",
            EntityKind::UsAppCitations => "us_app_citations",
            EntityKind::People => "people",
            EntityKind::Classifications => "classifications",
            EntityKind::Summaries => "summaries",
        };
        write!(f, "{}", label)
    }
}

fn bibliographic_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::keyword("patent_id"),
        FieldSpec::text("patent_title"),
        FieldSpec::date("patent_date"),
        FieldSpec::integer("num_claims"),
        FieldSpec::keyword("patent_type"),
        FieldSpec::text("patent_abstract"),
    ]
}

fn bibliographic_schema() -> CollectionSchema {
    CollectionSchema::unique_by("patent_id", bibliographic_fields())
}

fn claim_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::integer("claim_sequence"),
        FieldSpec::text("claim_text"),
        FieldSpec::boolean("dependent"),
        FieldSpec::integer("claim_number"),
        FieldSpec::boolean("exemplary"),
    ]
}

fn citation_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::integer("citation_sequence"),
        FieldSpec::keyword("citation_document_number"),
        FieldSpec::date("citation_date"),
        FieldSpec::text("record_name"),
        FieldSpec::keyword("wipo_kind"),
        FieldSpec::keyword("citation_category"),
    ]
}

fn person_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::keyword("applicant_authority"),
        FieldSpec::text("applicant_organization"),
        FieldSpec::text("applicant_full_name"),
        FieldSpec::keyword("assignee_id"),
        FieldSpec::text("assignee_organization"),
        FieldSpec::text("assignee_full_name"),
        FieldSpec::keyword("inventor_id"),
        FieldSpec::keyword("gender_code"),
        FieldSpec::text("inventor_full_name"),
    ]
}

fn classification_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::keyword("cpc_section"),
        FieldSpec::keyword("cpc_class"),
        FieldSpec::keyword("cpc_subclass"),
        FieldSpec::keyword("cpc_group"),
        FieldSpec::keyword("cpc_type"),
        FieldSpec::text("cpc_group_title"),
        FieldSpec::text("cpc_class_title"),
    ]
}

/// Schema of the composite search collection, unique by `patent_id`
pub fn composite_schema() -> CollectionSchema {
    let mut people = vec![FieldSpec::keyword("patent_id")];
    people.extend(person_fields());

    let mut fields = bibliographic_fields();
    fields.extend([
        FieldSpec::text("summary"),
        FieldSpec::text("claims_text"),
        FieldSpec::nested("claims", claim_fields()),
        FieldSpec::nested("people", people),
        FieldSpec::nested("cpc_classes", classification_fields()),
        FieldSpec::nested("us_app_citations", citation_fields()),
        FieldSpec::nested("us_citations", citation_fields()),
    ]);
    CollectionSchema::unique_by("patent_id", fields)
}
