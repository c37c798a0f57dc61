//! Collection schemas and per-record validation
//!
//! A schema names the lookup key field and declares typed fields. Records are
//! validated one at a time so that a bulk write can reject individual records
//! without failing the rest of the batch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::traits::Record;

/// Storage type of a declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Exact-match string (identifiers, codes)
    Keyword,
    /// Free text, searchable by token
    Text,
    Integer,
    Boolean,
    /// `YYYY-MM-DD`, optionally followed by a time part
    Date,
    /// Array of objects with their own declared fields
    Nested(Vec<FieldSpec>),
}

/// A declared field in a collection schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Keyword)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn nested(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self::new(name, FieldType::Nested(fields))
    }
}

/// Schema of a collection
///
/// `key_field` is the field point queries match on. When `unique_key` is set
/// the key doubles as the document id, so writing a record with an existing
/// key overwrites the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub key_field: String,
    pub unique_key: bool,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    /// Schema whose key may repeat across records (satellite collections)
    pub fn keyed_by(key_field: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            key_field: key_field.into(),
            unique_key: false,
            fields,
        }
    }

    /// Schema whose key identifies exactly one document
    pub fn unique_by(key_field: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            key_field: key_field.into(),
            unique_key: true,
            fields,
        }
    }

    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Extract the key of a record, if present and non-empty
    pub fn key_of<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record
            .get(&self.key_field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Validate a record against this schema.
    ///
    /// Undeclared fields are accepted. Declared fields may be absent or null.
    pub fn validate(&self, record: &Record) -> Result<(), String> {
        if self.key_of(record).is_none() {
            return Err(format!("missing or empty key field '{}'", self.key_field));
        }
        validate_fields(&self.fields, record, "")
    }
}

fn validate_fields(fields: &[FieldSpec], record: &Record, path: &str) -> Result<(), String> {
    for spec in fields {
        let Some(value) = record.get(&spec.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let name = if path.is_empty() {
            spec.name.clone()
        } else {
            format!("{}.{}", path, spec.name)
        };
        check_value(&spec.field_type, value, &name)?;
    }
    Ok(())
}

fn check_value(field_type: &FieldType, value: &Value, name: &str) -> Result<(), String> {
    match field_type {
        FieldType::Keyword | FieldType::Text => {
            if !value.is_string() {
                return Err(format!("field '{}' expected string, got {}", name, kind_of(value)));
            }
        }
        FieldType::Integer => {
            if value.as_i64().is_none() {
                return Err(format!("field '{}' expected integer, got {}", name, kind_of(value)));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                return Err(format!("field '{}' expected boolean, got {}", name, kind_of(value)));
            }
        }
        FieldType::Date => {
            let Some(text) = value.as_str() else {
                return Err(format!("field '{}' expected date string, got {}", name, kind_of(value)));
            };
            if parse_date(text).is_none() {
                return Err(format!("field '{}' is not a valid date: '{}'", name, text));
            }
        }
        FieldType::Nested(inner) => {
            let Some(items) = value.as_array() else {
                return Err(format!("field '{}' expected array, got {}", name, kind_of(value)));
            };
            for (idx, item) in items.iter().enumerate() {
                let Some(obj) = item.as_object() else {
                    return Err(format!("field '{}[{}]' expected object, got {}", name, idx, kind_of(item)));
                };
                validate_fields(inner, obj, &format!("{}[{}]", name, idx))?;
            }
        }
    }
    Ok(())
}

/// Parse the calendar-date prefix of a date string.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
