//! Data schema describing the fields a template may reference.
//!
//! Accepts the JSON-schema-like shape `{"properties": {...}, "required": [...]}`
//! from a file, a JSON string, or an already parsed value.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;

/// Declared shape of one schema field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared type names; more than one for union types.
    pub types: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: BTreeMap<String, FieldSpec>,
    pub required: BTreeSet<String>,
}

/// A data record that does not satisfy the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    MissingRequired {
        field: String,
    },
    TypeMismatch {
        field: String,
        expected: String,
        actual: &'static str,
    },
}

impl Schema {
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::io(path, source))?;
        let schema = Self::from_json_str(&content)?;
        debug!(path = %path.display(), fields = schema.fields.len(), "loaded schema");
        Ok(schema)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Object(root) = value else {
            return Err(SchemaError::Shape("schema root must be an object".to_string()));
        };
        let mut fields = BTreeMap::new();
        match root.get("properties") {
            None | Some(Value::Null) => {}
            Some(Value::Object(properties)) => {
                for (name, spec) in properties {
                    fields.insert(name.clone(), parse_field(spec));
                }
            }
            Some(_) => {
                return Err(SchemaError::Shape("`properties` must be an object".to_string()));
            }
        }
        let mut required = BTreeSet::new();
        match root.get("required") {
            None | Some(Value::Null) => {}
            Some(Value::Array(names)) => {
                for name in names {
                    let Value::String(name) = name else {
                        return Err(SchemaError::Shape(
                            "`required` must list field names".to_string(),
                        ));
                    };
                    required.insert(name.clone());
                }
            }
            Some(_) => {
                return Err(SchemaError::Shape("`required` must be an array".to_string()));
            }
        }
        Ok(Self { fields, required })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Declared type of a field, with unions joined by `|`.
    pub fn field_type(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|spec| !spec.types.is_empty())
            .map(|spec| spec.types.join("|"))
    }

    pub fn field_description(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.description.as_deref()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Case-insensitive field lookup, since converted templates lowercase paths.
    pub fn has_field_ignore_case(&self, name: &str) -> bool {
        self.fields
            .keys()
            .chain(&self.required)
            .any(|field| field.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.required.is_empty()
    }

    /// Checks a data record against required fields and declared types.
    pub fn check_record(&self, record: &Value) -> Vec<SchemaViolation> {
        let Value::Object(record) = record else {
            return self
                .required
                .iter()
                .map(|field| SchemaViolation::MissingRequired {
                    field: field.clone(),
                })
                .collect();
        };
        let mut violations: Vec<SchemaViolation> = self
            .required
            .iter()
            .filter(|field| !record.contains_key(field.as_str()))
            .map(|field| SchemaViolation::MissingRequired {
                field: field.clone(),
            })
            .collect();
        for (name, value) in record {
            let Some(spec) = self.fields.get(name) else {
                continue;
            };
            if spec.types.is_empty() || spec.types.iter().any(|t| type_matches(value, t)) {
                continue;
            }
            violations.push(SchemaViolation::TypeMismatch {
                field: name.clone(),
                expected: spec.types.join("|"),
                actual: json_type_name(value),
            });
        }
        violations
    }
}

fn parse_field(spec: &Value) -> FieldSpec {
    let types = match spec.get("type") {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    let description = spec
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    FieldSpec { types, description }
}

fn type_matches(value: &Value, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type names are not enforced.
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn contact_schema() -> Schema {
        Schema::from_value(&json!({
            "properties": {
                "Name": {"type": "string", "description": "Full name"},
                "Email": {"type": "string"},
                "Age": {"type": ["integer", "null"]},
                "Tags": {"type": "array"}
            },
            "required": ["Email"]
        }))
        .expect("valid schema")
    }

    #[test]
    fn loads_fields_and_required() {
        let schema = contact_schema();
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["Age", "Email", "Name", "Tags"]
        );
        assert_eq!(schema.field_type("Age").as_deref(), Some("integer|null"));
        assert_eq!(schema.field_description("Name"), Some("Full name"));
        assert!(schema.is_required("Email"));
        assert!(!schema.is_required("Name"));
        assert!(schema.has_field_ignore_case("email"));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            Schema::from_value(&json!([1, 2])),
            Err(SchemaError::Shape(_))
        ));
        assert!(matches!(
            Schema::from_value(&json!({"required": "Email"})),
            Err(SchemaError::Shape(_))
        ));
        assert!(matches!(
            Schema::from_json_str("{not json"),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn checks_record_types() {
        let schema = contact_schema();
        let violations = schema.check_record(&json!({
            "Name": 42,
            "Age": null,
            "Tags": [],
            "Extra": true
        }));
        assert_eq!(
            violations,
            vec![
                SchemaViolation::MissingRequired {
                    field: "Email".to_string()
                },
                SchemaViolation::TypeMismatch {
                    field: "Name".to_string(),
                    expected: "string".to_string(),
                    actual: "integer",
                },
            ]
        );
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{"properties": {"Id": {"type": "string"}}}"#).expect("write");
        let schema = Schema::from_path(&path).expect("load schema");
        assert_eq!(schema.field_type("Id").as_deref(), Some("string"));
        assert!(matches!(
            Schema::from_path(&dir.path().join("missing.json")),
            Err(SchemaError::Io { .. })
        ));
    }
}
