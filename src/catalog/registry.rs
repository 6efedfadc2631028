/// Built-in module-type catalog
///
/// The catalog is populated once at process start and read-only thereafter.
/// Module types are keyed by id; graph building resolves every module
/// instance against this map and treats an unknown id as a fatal error for
/// that workflow.

use crate::catalog::types::{FieldSchema, ModuleCategory, ModuleType};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Read-only registry of the module types the engine knows how to run
#[derive(Debug)]
pub struct ModuleCatalog {
    types: HashMap<String, ModuleType>,
}

impl ModuleCatalog {
    /// Catalog of all built-in module types
    pub fn builtin() -> Self {
        let mut types = HashMap::new();
        for module_type in builtin_types() {
            types.insert(module_type.id.clone(), module_type);
        }
        Self { types }
    }

    /// Resolve a module-type id to its definition
    pub fn resolve(&self, type_id: &str) -> Option<&ModuleType> {
        self.types.get(type_id)
    }

    /// All module types, ordered by id for a stable catalog listing
    pub fn all(&self) -> Vec<&ModuleType> {
        let mut all: Vec<&ModuleType> = self.types.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

fn schema(fields: Vec<(&str, FieldSchema)>) -> BTreeMap<String, FieldSchema> {
    fields.into_iter().map(|(name, field)| (name.to_string(), field)).collect()
}

fn ports(entries: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
    entries.into_iter().map(|(name, hint)| (name.to_string(), hint)).collect()
}

/// The static module-type definitions
///
/// AI model types carry a `provider` field naming the provider client and a
/// `prompt` template with `{{port}}` placeholders resolved from input values.
fn builtin_types() -> Vec<ModuleType> {
    vec![
        ModuleType {
            id: "text-input".to_string(),
            name: "Text Input".to_string(),
            category: ModuleCategory::Input,
            description: "Text supplied by the caller at run time".to_string(),
            config_schema: schema(vec![
                ("label", FieldSchema::string("Text Input")),
                ("default", FieldSchema::string_optional()),
            ]),
            input_schema: ports(vec![]),
            output_schema: ports(vec![("output", json!({"type": "string"}))]),
        },
        ModuleType {
            id: "file-input".to_string(),
            name: "File Input".to_string(),
            category: ModuleCategory::Input,
            description: "File payload supplied by the caller at run time".to_string(),
            config_schema: schema(vec![
                ("label", FieldSchema::string("File Input")),
                ("accept", FieldSchema::string("*/*")),
                ("default", FieldSchema::string_optional()),
            ]),
            input_schema: ports(vec![]),
            output_schema: ports(vec![("output", json!({"type": "object"}))]),
        },
        ModuleType {
            id: "openai-text".to_string(),
            name: "OpenAI Text Model".to_string(),
            category: ModuleCategory::AiModel,
            description: "OpenAI text generation model (GPT-4, etc.)".to_string(),
            config_schema: schema(vec![
                ("provider", FieldSchema::string("openai")),
                ("model", FieldSchema::string("gpt-4-turbo")),
                ("temperature", FieldSchema::number(0.7).with_range(0.0, 2.0)),
                ("max_tokens", FieldSchema::number(1000.0)),
                ("prompt", FieldSchema::string("{{input}}")),
            ]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![("output", json!({"type": "string"}))]),
        },
        ModuleType {
            id: "anthropic-claude".to_string(),
            name: "Anthropic Claude".to_string(),
            category: ModuleCategory::AiModel,
            description: "Anthropic Claude model".to_string(),
            config_schema: schema(vec![
                ("provider", FieldSchema::string("anthropic")),
                ("model", FieldSchema::string("claude-3-opus-20240229")),
                ("temperature", FieldSchema::number(0.7).with_range(0.0, 1.0)),
                ("max_tokens", FieldSchema::number(1000.0)),
                ("prompt", FieldSchema::string("{{input}}")),
            ]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![("output", json!({"type": "string"}))]),
        },
        ModuleType {
            id: "openai-image".to_string(),
            name: "OpenAI DALL-E".to_string(),
            category: ModuleCategory::AiModel,
            description: "OpenAI DALL-E image generation".to_string(),
            config_schema: schema(vec![
                ("provider", FieldSchema::string("openai-image")),
                ("model", FieldSchema::string("dall-e-3")),
                (
                    "size",
                    FieldSchema::string("1024x1024")
                        .with_allowed(&["1024x1024", "1792x1024", "1024x1792"]),
                ),
                ("prompt", FieldSchema::string("{{input}}")),
            ]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![("output", json!({"type": "string"}))]),
        },
        ModuleType {
            id: "text-output".to_string(),
            name: "Text Output".to_string(),
            category: ModuleCategory::Output,
            description: "Display text output".to_string(),
            config_schema: schema(vec![("label", FieldSchema::string("Output"))]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![]),
        },
        ModuleType {
            id: "image-output".to_string(),
            name: "Image Output".to_string(),
            category: ModuleCategory::Output,
            description: "Display image output".to_string(),
            config_schema: schema(vec![("label", FieldSchema::string("Image"))]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![]),
        },
        ModuleType {
            id: "conditional".to_string(),
            name: "Conditional Logic".to_string(),
            category: ModuleCategory::Logic,
            description: "Route the input to the true or false branch".to_string(),
            config_schema: schema(vec![
                (
                    "operator",
                    FieldSchema::string("contains").with_allowed(&[
                        "equals",
                        "not_equals",
                        "contains",
                        "not_contains",
                        "greater_than",
                        "less_than",
                    ]),
                ),
                ("operand", FieldSchema::string("")),
            ]),
            input_schema: ports(vec![("input", json!({"type": "string"}))]),
            output_schema: ports(vec![
                ("true", json!({"type": "any"})),
                ("false", json!({"type": "any"})),
            ]),
        },
        ModuleType {
            id: "transform".to_string(),
            name: "Transform".to_string(),
            category: ModuleCategory::Logic,
            description: "Transform data with a Lua script".to_string(),
            config_schema: schema(vec![("script", FieldSchema::string("return input"))]),
            input_schema: ports(vec![("input", json!({"type": "any"}))]),
            output_schema: ports(vec![("output", json!({"type": "any"}))]),
        },
    ]
}
