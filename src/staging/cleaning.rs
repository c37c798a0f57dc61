//! Field cleaning applied to raw delimited-file cells

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Trimmed cell text; missing cells become empty strings.
pub fn clean_string(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize free text: drop punctuation, collapse whitespace, trim.
pub fn normalize_free_text(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let stripped = punctuation().replace_all(raw.trim(), "");
    whitespace_runs().replace_all(&stripped, " ").trim().to_string()
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date in any of the accepted input formats and render it as
/// `YYYY-MM-DD`. Unparseable or empty input yields `None`.
pub fn normalize_date(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })?;

    Some(date.format("%Y-%m-%d").to_string())
}
