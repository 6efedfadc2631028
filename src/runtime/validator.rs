/// Config schema validation
///
/// Validates a module instance's stored configuration against its type's
/// declared schema: absent fields fall back to schema defaults, declared
/// kinds and enum/range constraints are enforced, and fields the schema does
/// not know pass through unchanged as non-fatal warnings.
///
/// Pure and deterministic - no side effects, suitable for calling at graph
/// build for every module.

use crate::catalog::{FieldKind, FieldSchema};
use crate::runtime::error::{ConfigError, ConfigErrorReason};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A module configuration after schema validation
///
/// Holds the effective field values (supplied or defaulted) plus the names
/// of fields the schema did not declare.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedConfig {
    values: Map<String, Value>,
    warnings: Vec<String>,
}

impl ValidatedConfig {
    /// Effective value of a field, if set
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Effective string value of a field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    /// Effective numeric value of a field
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.values.get(field).and_then(Value::as_f64)
    }

    /// Effective integer value of a field
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.values.get(field).and_then(|v| {
            v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64))
        })
    }

    /// All effective fields
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Names of config fields the schema does not declare
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Validate a config mapping against a declared field schema
///
/// Fails on the first violating field, in schema order, so error reporting
/// is deterministic. A `null` supplied value counts as absent; a `null`
/// schema default means the field simply stays unset.
pub fn validate(
    schema: &BTreeMap<String, FieldSchema>,
    config: &Map<String, Value>,
) -> Result<ValidatedConfig, ConfigError> {
    let mut values = Map::new();

    for (name, field) in schema {
        let supplied = config.get(name).filter(|v| !v.is_null());
        let value = match supplied {
            Some(value) => {
                check_field(name, field, value)?;
                value.clone()
            }
            None => {
                if field.default.is_null() {
                    continue;
                }
                field.default.clone()
            }
        };
        values.insert(name.clone(), value);
    }

    // Forward-compatibility: unknown fields pass through, flagged not fatal
    let mut warnings = Vec::new();
    for (name, value) in config {
        if !schema.contains_key(name) {
            warnings.push(name.clone());
            values.insert(name.clone(), value.clone());
        }
    }

    Ok(ValidatedConfig { values, warnings })
}

fn check_field(name: &str, field: &FieldSchema, value: &Value) -> Result<(), ConfigError> {
    let kind_matches = match field.kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
    };
    if !kind_matches {
        return Err(ConfigError {
            field: name.to_string(),
            reason: ConfigErrorReason::TypeMismatch {
                expected: field.kind,
                got: json_type_name(value).to_string(),
            },
        });
    }

    if let Some(allowed) = &field.allowed {
        if !allowed.contains(value) {
            return Err(ConfigError {
                field: name.to_string(),
                reason: ConfigErrorReason::InvalidEnumValue {
                    allowed: allowed.clone(),
                },
            });
        }
    }

    if field.kind == FieldKind::Number {
        let number = value.as_f64().unwrap_or_default();
        let below = field.min.map(|min| number < min).unwrap_or(false);
        let above = field.max.map(|max| number > max).unwrap_or(false);
        if below || above {
            return Err(ConfigError {
                field: name.to_string(),
                reason: ConfigErrorReason::OutOfRange {
                    min: field.min,
                    max: field.max,
                },
            });
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
