/// Module type definitions for the built-in catalog
///
/// A ModuleType describes one kind of node a user can drop onto the canvas:
/// its category (which executor runs it), its config schema (which fields the
/// editor renders and the validator checks), and its port schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Behavioral class of a module
///
/// The category decides which executor arm runs the module. Wire names match
/// the editor's JSON payloads ("AI Model", not "AiModel").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleCategory {
    /// Captures an externally supplied runtime value
    Input,
    /// Calls an external AI provider
    #[serde(rename = "AI Model")]
    AiModel,
    /// Conditional branching and data transformation
    Logic,
    /// Terminal passthrough whose value becomes part of the run result
    Output,
}

/// Declared value kind of a single config field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// Schema of one config field: declared kind plus optional constraints
///
/// A `null` default means "no default configured" - the field simply stays
/// unset when the user leaves it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Declared value kind
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Default substituted when the field is absent from a module's config
    #[serde(default)]
    pub default: Value,
    /// Closed set of allowed values, when declared
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Inclusive lower bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldSchema {
    /// String field with a default value
    pub fn string(default: &str) -> Self {
        Self {
            kind: FieldKind::String,
            default: Value::String(default.to_string()),
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// String field with no default configured
    pub fn string_optional() -> Self {
        Self {
            kind: FieldKind::String,
            default: Value::Null,
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// Number field with a default value
    pub fn number(default: f64) -> Self {
        let default = serde_json::Number::from_f64(default)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        Self {
            kind: FieldKind::Number,
            default,
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// Restrict the field to a closed set of string values
    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = Some(allowed.iter().map(|v| Value::String(v.to_string())).collect());
        self
    }

    /// Constrain a numeric field to an inclusive range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// One entry of the module-type catalog
///
/// Immutable; defined by the catalog at process start, never by end users.
/// `input_schema` / `output_schema` describe the ports for the editor's
/// benefit - the engine routes values by connection, not by these maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleType {
    /// Stable type identifier (e.g. "openai-text")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Behavioral category deciding the executor
    pub category: ModuleCategory,
    /// Short description shown in the editor palette
    pub description: String,
    /// Field name -> declared schema, validated against each instance's config
    pub config_schema: BTreeMap<String, FieldSchema>,
    /// Named input ports with loose type hints
    #[serde(default)]
    pub input_schema: BTreeMap<String, Value>,
    /// Named output ports with loose type hints
    #[serde(default)]
    pub output_schema: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_uses_editor_wire_names() {
        assert_eq!(serde_json::to_value(ModuleCategory::AiModel).unwrap(), json!("AI Model"));
        assert_eq!(serde_json::to_value(ModuleCategory::Input).unwrap(), json!("Input"));
        let parsed: ModuleCategory = serde_json::from_value(json!("AI Model")).unwrap();
        assert_eq!(parsed, ModuleCategory::AiModel);
    }

    #[test]
    fn field_schema_round_trips_editor_json() {
        let raw = json!({
            "type": "number",
            "default": 0.7,
            "min": 0.0,
            "max": 2.0
        });
        let schema: FieldSchema = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(schema.kind, FieldKind::Number);
        assert_eq!(schema.default, json!(0.7));
        assert_eq!(serde_json::to_value(&schema).unwrap(), raw);
    }

    #[test]
    fn enum_constraint_uses_enum_key() {
        let schema: FieldSchema = serde_json::from_value(json!({
            "type": "string",
            "default": "1024x1024",
            "enum": ["1024x1024", "1792x1024"]
        }))
        .unwrap();
        assert_eq!(schema.allowed.as_ref().map(Vec::len), Some(2));
    }
}
