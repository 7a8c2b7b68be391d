//! Structured extraction from free-form generation output.
//!
//! Generation output is natural-language text that may wrap the JSON the
//! prompt asked for in leading or trailing commentary. This module is the
//! sole boundary absorbing that unreliability: it locates the candidate
//! object span (first `{` through last `}`), parses it, and validates it
//! against an expected field schema so every later pipeline stage can
//! assume a typed value.
//!
//! Out-of-range numeric values are never coerced or clamped; they surface
//! as [`SchemaError::OutOfRange`] and the caller decides whether that is
//! fatal.

use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use bookbound_types::error::{ExtractionError, SchemaError};

/// Locate and parse the JSON object embedded in `text`.
///
/// Takes the greedy span from the first `{` to the last `}`. A missing or
/// inverted span, an unbalanced span, or a span that parses to something
/// other than an object all fail with [`ExtractionError`].
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or(ExtractionError::NoJsonObject)?;

    let span = &text[start..=end];
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::Unparsable(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(ExtractionError::Unparsable(e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Expected type (and optionally range) of one schema field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// An integer, optionally restricted to an inclusive range.
    Integer { range: Option<RangeInclusive<i64>> },
    /// Free text.
    Text,
}

/// One required field of an expected JSON object.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

/// An expected field schema for extracted objects.
///
/// All named fields are required; extra fields in the object are ignored.
#[derive(Debug, Clone)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Check `map` against this schema.
    pub fn validate(&self, map: &Map<String, Value>) -> Result<(), SchemaError> {
        for spec in self.fields {
            let value = map
                .get(spec.name)
                .ok_or(SchemaError::MissingField(spec.name))?;

            match &spec.ty {
                FieldType::Integer { range } => {
                    let n = value.as_i64().ok_or(SchemaError::WrongType {
                        field: spec.name,
                        expected: "integer",
                    })?;
                    if let Some(range) = range {
                        if !range.contains(&n) {
                            return Err(SchemaError::OutOfRange {
                                field: spec.name,
                                value: n,
                                min: *range.start(),
                                max: *range.end(),
                            });
                        }
                    }
                }
                FieldType::Text => {
                    if !value.is_string() {
                        return Err(SchemaError::WrongType {
                            field: spec.name,
                            expected: "string",
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Read a required integer field from an already-validated map.
pub fn integer_field(map: &Map<String, Value>, name: &'static str) -> Result<i64, SchemaError> {
    map.get(name)
        .ok_or(SchemaError::MissingField(name))?
        .as_i64()
        .ok_or(SchemaError::WrongType {
            field: name,
            expected: "integer",
        })
}
