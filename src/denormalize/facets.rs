//! Merging satellite rows into a composite document

use crate::config::LookupCaps;
use crate::model::{
    from_record, BibliographicRecord, CitationEntry, ClaimEntry, ClassificationEntry,
    ComposedPatentDocument, EntityKind, PersonRecord,
};
use crate::store::Record;
use serde::Deserialize;

/// Satellite kinds looked up for every bibliographic record, in merge order
pub const SATELLITES: [EntityKind; 6] = [
    EntityKind::UsCitations,
    EntityKind::UsAppCitations,
    EntityKind::Summaries,
    EntityKind::Claims,
    EntityKind::People,
    EntityKind::Classifications,
];

/// Maximum rows fetched from a satellite for one patent
pub fn lookup_cap(caps: &LookupCaps, kind: EntityKind) -> usize {
    match kind {
        EntityKind::UsCitations => caps.us_citations,
        EntityKind::UsAppCitations => caps.us_app_citations,
        EntityKind::Summaries => caps.summary,
        EntityKind::Claims => caps.claims,
        EntityKind::People => caps.people,
        EntityKind::Classifications => caps.cpc_classes,
        EntityKind::Bibliographic => 0,
    }
}

/// Rows that fail to decode are dropped; every field has a default, so only
/// wrongly-typed values get here.
fn entries<T: for<'de> Deserialize<'de>>(rows: Vec<Record>) -> Vec<T> {
    rows.into_iter().filter_map(|row| from_record(row).ok()).collect()
}

/// Attach one satellite's rows to the document, keeping lookup order.
pub fn merge_facet(doc: &mut ComposedPatentDocument, kind: EntityKind, rows: Vec<Record>) {
    match kind {
        EntityKind::Claims => doc.set_claims(entries::<ClaimEntry>(rows)),
        EntityKind::People => doc.people = entries::<PersonRecord>(rows),
        EntityKind::Classifications => doc.cpc_classes = entries::<ClassificationEntry>(rows),
        EntityKind::UsCitations => doc.us_citations = entries::<CitationEntry>(rows),
        EntityKind::UsAppCitations => doc.us_app_citations = entries::<CitationEntry>(rows),
        EntityKind::Summaries => {
            doc.summary = rows
                .into_iter()
                .find_map(|row| row.get("summary").and_then(|v| v.as_str()).map(str::to_string))
        }
        EntityKind::Bibliographic => {}
    }
}

/// Compose a document from a bibliographic record and the satellite rows
/// found for it. Satellites absent from `facets` stay empty.
pub fn compose(
    bibliographic: BibliographicRecord,
    facets: impl IntoIterator<Item = (EntityKind, Vec<Record>)>,
) -> ComposedPatentDocument {
    let mut doc = ComposedPatentDocument::new(bibliographic);
    for (kind, rows) in facets {
        merge_facet(&mut doc, kind, rows);
    }
    doc
}
