//! Tagged representations of fields that arrive in more than one shape
//!
//! Search hits may come from documents written by older pipelines, so the
//! date and classification fields are decoded once into these types instead
//! of being inspected shape by shape at every use site.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patent date: either a plain date string or a range object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatentDate {
    Day(String),
    Range { from: String },
}

impl PatentDate {
    /// Decode a loosely-typed value; any other shape yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        // Derived struct visitors also accept sequences
        if value.is_array() {
            return None;
        }
        Self::deserialize(value).ok()
    }

    /// The date text (start of the range for ranges)
    pub fn as_str(&self) -> &str {
        match self {
            PatentDate::Day(day) => day,
            PatentDate::Range { from } => from,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CodeEntry {
    Code(String),
    // A map rather than a derived struct, which would also accept sequences
    Object(Map<String, Value>),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CodeShape {
    List(Vec<CodeEntry>),
    Single(String),
}

/// Classification codes flattened to strings
///
/// Accepts a list of classification objects (their `cpc_class` then
/// `cpc_section` values are taken when non-empty strings), a list of
/// strings, or a single string. Anything else decodes to no codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassificationCodes(pub Vec<String>);

impl ClassificationCodes {
    pub fn from_value(value: &Value) -> Self {
        let Ok(shape) = CodeShape::deserialize(value) else {
            return Self::default();
        };

        let codes = match shape {
            CodeShape::Single(code) => vec![code],
            CodeShape::List(entries) => {
                let mut codes = Vec::new();
                for entry in entries {
                    match entry {
                        CodeEntry::Code(code) => codes.push(code),
                        CodeEntry::Object(mut fields) => {
                            for key in ["cpc_class", "cpc_section"] {
                                if let Some(Value::String(s)) = fields.remove(key) {
                                    if !s.is_empty() {
                                        codes.push(s);
                                    }
                                }
                            }
                        }
                        CodeEntry::Other(_) => {}
                    }
                }
                codes
            }
        };
        Self(codes)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}
