//! Normalizing loosely-shaped search hits

use crate::model::{ClassificationCodes, PatentDate};
use crate::store::{Hit, Record};
use serde::Serialize;
use serde_json::Value;

/// An inventor reference attached to a projected patent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorRef {
    pub name: String,
    pub id: String,
}

/// The patent fields a query response carries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatentView {
    pub id: String,
    pub title: String,
    /// Date text as stored, or empty when absent or of an unknown shape
    pub date: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub num_claims: i64,
    pub cpc_classes: Vec<String>,
    pub inventors: Vec<InventorRef>,
}

fn text(source: &Record, field: &str) -> String {
    match source.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn inventors(source: &Record) -> Vec<InventorRef> {
    let Some(Value::Array(people)) = source.get("people") else {
        return Vec::new();
    };
    people
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|person| {
            let name = text(person, "inventor_full_name");
            if name.is_empty() {
                return None;
            }
            Some(InventorRef {
                name,
                id: text(person, "inventor_id"),
            })
        })
        .collect()
}

/// Project a hit into a `PatentView`.
pub fn project(hit: &Hit) -> PatentView {
    let source = &hit.source;

    let date = source
        .get("patent_date")
        .and_then(PatentDate::from_value)
        .map(|d| d.as_str().to_string())
        .unwrap_or_default();
    let cpc_classes = source
        .get("cpc_classes")
        .map(ClassificationCodes::from_value)
        .unwrap_or_default()
        .into_inner();
    let num_claims = match source.get("num_claims") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    PatentView {
        id: text(source, "patent_id"),
        title: text(source, "patent_title"),
        date,
        abstract_text: text(source, "patent_abstract"),
        num_claims,
        cpc_classes,
        inventors: inventors(source),
    }
}
