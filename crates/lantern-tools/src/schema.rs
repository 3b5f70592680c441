//! JSON-schema parameter shapes and structural validation.
//!
//! Validation is deliberately structural rather than a full JSON Schema
//! implementation: type checks, required properties, enum membership, and
//! numeric bounds cover every shape the registry's declared schemas use.
//! Failures carry dotted field paths so callers can point at the exact
//! offending argument.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::FieldIssue;

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Top-level JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Description of the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catch-all for additional JSON Schema properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterSchema {
    /// An `object` schema with the given properties and required names.
    #[must_use]
    pub fn object(properties: Map<String, Value>, required: &[&str]) -> Self {
        Self {
            schema_type: "object".into(),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required.iter().map(|s| (*s).to_owned()).collect())
            },
            description: None,
            extra: Map::new(),
        }
    }

    /// An `object` schema accepting anything.
    #[must_use]
    pub fn any_object() -> Self {
        Self {
            schema_type: "object".into(),
            properties: None,
            required: None,
            description: None,
            extra: Map::new(),
        }
    }

    /// Validate a value against this schema, collecting every failure.
    #[must_use]
    pub fn check(&self, value: &Value) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        let as_value = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(e) => {
                issues.push(FieldIssue::new("", format!("unusable schema: {e}")));
                return issues;
            }
        };
        check_value(&as_value, value, "", &mut issues);
        issues
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "null" => value.is_null(),
        // Unknown type keyword: don't reject what we can't check.
        _ => true,
    }
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_owned()
    } else {
        format!("{base}.{key}")
    }
}

fn check_value(schema: &Value, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            issues.push(FieldIssue::new(
                path,
                format!("expected {expected}, got {}", type_name(value)),
            ));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let rendered: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            issues.push(FieldIssue::new(
                path,
                format!("must be one of [{}]", rendered.join(", ")),
            ));
            return;
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                issues.push(FieldIssue::new(path, format!("must be >= {min}")));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                issues.push(FieldIssue::new(path, format!("must be <= {max}")));
            }
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(name) {
                    issues.push(FieldIssue::new(
                        join_path(path, name),
                        "required property missing",
                    ));
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, sub_schema) in properties {
                if let Some(sub_value) = obj.get(name) {
                    check_value(sub_schema, sub_value, &join_path(path, name), issues);
                }
            }
        }
    }

    if let (Some(items), Some(item_schema)) = (value.as_array(), schema.get("items")) {
        for (index, item) in items.iter().enumerate() {
            check_value(item_schema, item, &join_path(path, &index.to_string()), issues);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_schema() -> ParameterSchema {
        let props = json!({
            "query": { "type": "string", "description": "Free-text query." },
            "category": { "type": "string", "enum": ["sighting", "abduction", "light"] },
            "limit": { "type": "integer", "minimum": 1, "maximum": 25 },
        });
        let Value::Object(props) = props else {
            unreachable!()
        };
        ParameterSchema::object(props, &["query"])
    }

    #[test]
    fn valid_arguments_pass() {
        let issues = search_schema().check(&json!({
            "query": "lights over the ridge",
            "category": "sighting",
            "limit": 5,
        }));
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn missing_required_property_is_reported_by_path() {
        let issues = search_schema().check(&json!({ "limit": 5 }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "query");
        assert!(issues[0].detail.contains("required"));
    }

    #[test]
    fn wrong_type_is_reported() {
        let issues = search_schema().check(&json!({ "query": 42 }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "query");
        assert_eq!(issues[0].detail, "expected string, got number");
    }

    #[test]
    fn enum_membership_is_enforced() {
        let issues = search_schema().check(&json!({
            "query": "anything",
            "category": "cryptid",
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "category");
        assert!(issues[0].detail.contains("one of"));
    }

    #[test]
    fn numeric_bounds_are_enforced() {
        let low = search_schema().check(&json!({ "query": "q", "limit": 0 }));
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].path, "limit");
        assert!(low[0].detail.contains(">= 1"));

        let high = search_schema().check(&json!({ "query": "q", "limit": 100 }));
        assert_eq!(high.len(), 1);
        assert!(high[0].detail.contains("<= 25"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let issues = search_schema().check(&json!([1, 2, 3]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].detail, "expected object, got array");
    }

    #[test]
    fn nested_paths_are_dotted() {
        let props = json!({
            "filters": {
                "type": "object",
                "properties": { "limit": { "type": "integer" } },
                "required": ["limit"],
            },
        });
        let Value::Object(props) = props else {
            unreachable!()
        };
        let schema = ParameterSchema::object(props, &["filters"]);

        let issues = schema.check(&json!({ "filters": { "limit": "ten" } }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "filters.limit");
    }

    #[test]
    fn array_items_are_checked_by_index() {
        let props = json!({
            "ids": { "type": "array", "items": { "type": "string" } },
        });
        let Value::Object(props) = props else {
            unreachable!()
        };
        let schema = ParameterSchema::object(props, &[]);

        let issues = schema.check(&json!({ "ids": ["a", 2, "c"] }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "ids.1");
    }

    #[test]
    fn multiple_failures_are_all_collected() {
        let issues = search_schema().check(&json!({
            "category": 7,
            "limit": "many",
        }));
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn any_object_accepts_arbitrary_keys() {
        let issues = ParameterSchema::any_object().check(&json!({ "whatever": [1, 2] }));
        assert!(issues.is_empty());
    }

    #[test]
    fn serde_renames_schema_type_to_type() {
        let rendered = serde_json::to_value(search_schema()).unwrap();
        assert_eq!(rendered["type"], "object");
        assert!(rendered.get("schema_type").is_none());
    }
}
