//! Aggregates over projected patents
//!
//! Counting keeps first-appearance order so that output is deterministic
//! for a given hit order: the histogram lists sections as first seen, and
//! inventor ties keep the order in which names were first counted.

use super::projection::PatentView;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Patent years outside this range are treated as bad data
pub const YEAR_RANGE: std::ops::RangeInclusive<u32> = 1790..=2030;

/// Inventors returned by the ranking
pub const TOP_INVENTORS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCount {
    pub section: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorCount {
    pub name: String,
    pub count: usize,
}

/// Counts keyed by string, remembering first-appearance order
#[derive(Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, usize)>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), 1));
            }
        }
    }
}

fn year_of(date: &str) -> Option<String> {
    let year: String = date.chars().take(4).collect();
    if year.chars().count() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let numeric: u32 = year.parse().ok()?;
    YEAR_RANGE.contains(&numeric).then_some(year)
}

/// Patents per year, ascending by year.
pub fn aggregate_timeline(patents: &[PatentView]) -> Vec<YearCount> {
    let mut years: BTreeMap<String, usize> = BTreeMap::new();
    for year in patents.iter().filter_map(|p| year_of(&p.date)) {
        *years.entry(year).or_default() += 1;
    }
    years
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

/// Classification codes per section letter (the uppercased first character).
pub fn aggregate_classification_histogram(patents: &[PatentView]) -> Vec<SectionCount> {
    let mut sections = OrderedCounter::default();
    for code in patents.iter().flat_map(|p| &p.cpc_classes) {
        let Some(first) = code.chars().next() else {
            continue;
        };
        if first.is_alphabetic() {
            sections.add(&first.to_uppercase().to_string());
        }
    }
    sections
        .counts
        .into_iter()
        .map(|(section, count)| SectionCount { section, count })
        .collect()
}

/// The top inventors by number of appearances across all patents.
///
/// Ties keep first-appearance order.
pub fn aggregate_inventor_ranking(patents: &[PatentView]) -> Vec<InventorCount> {
    let mut inventors = OrderedCounter::default();
    for inventor in patents.iter().flat_map(|p| &p.inventors) {
        inventors.add(&inventor.name);
    }

    let mut ranked = inventors.counts;
    // Stable, so equal counts stay in first-appearance order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_INVENTORS);
    ranked
        .into_iter()
        .map(|(name, count)| InventorCount { name, count })
        .collect()
}
