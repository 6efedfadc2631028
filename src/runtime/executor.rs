/// Module execution handlers, one arm per category
///
/// The executor consumes the values routed to a module's input ports and
/// produces the module's output:
/// - Input: hands back the externally supplied runtime value
/// - AI Model: renders the prompt template and calls the provider client
/// - Logic: conditional branching, or a Lua transform script
/// - Output: passthrough of its single input
///
/// Executors work only on what they are handed and return a value; all
/// bookkeeping stays in the scheduler, so nothing here touches shared
/// mutable state.

use crate::catalog::ModuleCategory;
use crate::providers::{CompletionRequest, CredentialStore, ProviderRegistry};
use crate::runtime::context::ModuleOutput;
use crate::runtime::error::ExecutorError;
use crate::runtime::graph::{GraphNode, DEFAULT_INPUT_PORT};
use crate::runtime::validator::ValidatedConfig;
use mlua::LuaSerdeExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Config fields the AI executor consumes itself; everything else is passed
/// through to the provider as free-form options (e.g. DALL-E's `size`).
const AI_CORE_FIELDS: [&str; 6] = ["provider", "model", "temperature", "max_tokens", "prompt", "label"];

/// Executes one module per call, dispatching on its category
#[derive(Debug)]
pub struct ModuleExecutor {
    /// Shared, read-only provider clients
    providers: Arc<ProviderRegistry>,
    /// Shared, read-only API keys
    credentials: Arc<CredentialStore>,
    /// Deadline applied to each individual provider call
    provider_timeout: Duration,
}

impl ModuleExecutor {
    /// Create a new executor over shared provider resources
    pub fn new(
        providers: Arc<ProviderRegistry>,
        credentials: Arc<CredentialStore>,
        provider_timeout: Duration,
    ) -> Self {
        Self { providers, credentials, provider_timeout }
    }

    /// Execute a single module with the inputs routed to it
    ///
    /// `runtime_input` is the caller-supplied value bound to this module id;
    /// it is only meaningful for Input-category modules.
    pub async fn execute(
        &self,
        node: &GraphNode,
        inputs: BTreeMap<String, Value>,
        runtime_input: Option<Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        let module_id = node.id();
        tracing::debug!(
            "🚀 Executing module '{}' (type: {}, {} inputs)",
            module_id,
            node.module_type.id,
            inputs.len()
        );
        let start_time = std::time::Instant::now();

        let config = node.config.as_ref().map_err(|e| ExecutorError::from(e.clone()))?;

        let result = match node.category() {
            ModuleCategory::Input => self.execute_input(node, config, runtime_input),
            ModuleCategory::AiModel => self.execute_ai_model(node, config, &inputs).await,
            ModuleCategory::Logic => self.execute_logic(node, config, &inputs),
            ModuleCategory::Output => self.execute_output(node, &inputs),
        };

        match &result {
            Ok(_) => tracing::debug!(
                "✅ Module '{}' completed in {:?}",
                module_id,
                start_time.elapsed()
            ),
            Err(e) => tracing::warn!(
                "❌ Module '{}' failed in {:?} - {}",
                module_id,
                start_time.elapsed(),
                e
            ),
        }

        result
    }

    /// Input module: externally supplied runtime value, else configured default
    fn execute_input(
        &self,
        node: &GraphNode,
        config: &ValidatedConfig,
        runtime_input: Option<Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        if let Some(value) = runtime_input {
            return Ok(ModuleOutput::Value(value));
        }
        if let Some(default) = config.get("default").filter(|v| !v.is_null()) {
            return Ok(ModuleOutput::Value(default.clone()));
        }
        Err(ExecutorError::MissingRuntimeInput { module_id: node.id().to_string() })
    }

    /// AI Model module: render the prompt, call the provider under a deadline
    async fn execute_ai_model(
        &self,
        node: &GraphNode,
        config: &ValidatedConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        let provider_id = config.get_str("provider").unwrap_or("openai").to_string();
        let provider = self
            .providers
            .resolve(&provider_id)
            .ok_or_else(|| ExecutorError::UnknownProvider { provider: provider_id.clone() })?;

        let api_key = self.credentials.key_for(&provider_id);
        if provider.requires_api_key() && api_key.is_none() {
            return Err(ExecutorError::MissingCredentials { provider: provider_id });
        }

        let template = config.get_str("prompt").unwrap_or("{{input}}");
        let prompt = render_prompt(template, inputs, node.id())?;

        let options: BTreeMap<String, Value> = config
            .values()
            .iter()
            .filter(|(name, _)| !AI_CORE_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let request = CompletionRequest {
            model: config.get_str("model").unwrap_or_default().to_string(),
            prompt,
            temperature: config.get_f64("temperature"),
            max_tokens: config.get_u64("max_tokens"),
            options,
        };

        tracing::debug!(
            "🤖 Module '{}' calling provider '{}' (model: {})",
            node.id(),
            provider_id,
            request.model
        );

        match tokio::time::timeout(self.provider_timeout, provider.send(&request, api_key)).await {
            Ok(result) => result.map(|response| ModuleOutput::Value(Value::String(response.text))),
            Err(_) => Err(ExecutorError::Timeout {
                provider: provider_id,
                timeout_secs: self.provider_timeout.as_secs(),
            }),
        }
    }

    /// Logic module: conditional branch routing or Lua transform
    fn execute_logic(
        &self,
        node: &GraphNode,
        config: &ValidatedConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        match node.module_type.id.as_str() {
            "conditional" => {
                let value = single_input(inputs, node.id(), DEFAULT_INPUT_PORT)?.clone();
                let operator = config.get_str("operator").unwrap_or("contains");
                let operand = config.get_str("operand").unwrap_or("");
                let taken = evaluate_condition(node.id(), operator, operand, &value)?;
                let port = if taken { "true" } else { "false" };
                tracing::debug!("🔀 Module '{}' routed to branch '{}'", node.id(), port);
                Ok(ModuleOutput::Branch { port: port.to_string(), value })
            }
            "transform" => {
                let script = config.get_str("script").unwrap_or("return input");
                let result = run_lua_transform(node.id(), script, inputs)?;
                Ok(ModuleOutput::Value(result))
            }
            other => Err(ExecutorError::UnsupportedType { type_id: other.to_string() }),
        }
    }

    /// Output module: passthrough of its single input
    fn execute_output(
        &self,
        node: &GraphNode,
        inputs: &BTreeMap<String, Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        let value = single_input(inputs, node.id(), DEFAULT_INPUT_PORT)?;
        Ok(ModuleOutput::Value(value.clone()))
    }
}

/// Resolve a module's single input value
///
/// Prefers the named port; a module wired with exactly one input matches
/// regardless of how the editor labeled the handle.
fn single_input<'a>(
    inputs: &'a BTreeMap<String, Value>,
    module_id: &str,
    port: &str,
) -> Result<&'a Value, ExecutorError> {
    if let Some(value) = inputs.get(port) {
        return Ok(value);
    }
    if inputs.len() == 1 {
        if let Some(value) = inputs.values().next() {
            return Ok(value);
        }
    }
    Err(ExecutorError::MissingInput {
        module_id: module_id.to_string(),
        port: port.to_string(),
    })
}

/// Substitute `{{port}}` placeholders with input values
///
/// `{{input}}` names the default port. An unresolved placeholder falls back
/// to the sole input when exactly one exists; otherwise the module fails,
/// naming the placeholder as the missing port.
fn render_prompt(
    template: &str,
    inputs: &BTreeMap<String, Value>,
    module_id: &str,
) -> Result<String, ExecutorError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unterminated placeholder: keep the literal text
            rendered.push_str(&rest[start..]);
            return Ok(rendered);
        };
        let name = after[..end].trim();
        let value = inputs
            .get(name)
            .or_else(|| if inputs.len() == 1 { inputs.values().next() } else { None })
            .ok_or_else(|| ExecutorError::MissingInput {
                module_id: module_id.to_string(),
                port: name.to_string(),
            })?;
        rendered.push_str(&value_to_text(value));
        rest = &after[end + 2..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Render a JSON value the way a prompt or comparison wants to see it
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluate a conditional module's comparison rule
fn evaluate_condition(
    module_id: &str,
    operator: &str,
    operand: &str,
    value: &Value,
) -> Result<bool, ExecutorError> {
    let text = value_to_text(value);
    match operator {
        "equals" => Ok(text == operand),
        "not_equals" => Ok(text != operand),
        "contains" => Ok(text.contains(operand)),
        "not_contains" => Ok(!text.contains(operand)),
        "greater_than" | "less_than" => {
            let left = value.as_f64().or_else(|| text.parse::<f64>().ok()).ok_or_else(|| {
                ExecutorError::Condition {
                    module_id: module_id.to_string(),
                    message: format!("input '{}' is not numeric", text),
                }
            })?;
            let right = operand.parse::<f64>().map_err(|_| ExecutorError::Condition {
                module_id: module_id.to_string(),
                message: format!("operand '{}' is not numeric", operand),
            })?;
            Ok(if operator == "greater_than" { left > right } else { left < right })
        }
        other => Err(ExecutorError::Condition {
            module_id: module_id.to_string(),
            message: format!("unknown operator '{}'", other),
        }),
    }
}

/// Run a transform script in a fresh sandboxed Lua state
///
/// The script sees `input` (the module's single input, or nil) and `inputs`
/// (a table of every port value) and must return the transformed value.
/// Synchronous on purpose: the Lua state never crosses an await point.
fn run_lua_transform(
    module_id: &str,
    script: &str,
    inputs: &BTreeMap<String, Value>,
) -> Result<Value, ExecutorError> {
    let script_error = |e: mlua::Error| ExecutorError::Script {
        module_id: module_id.to_string(),
        message: e.to_string(),
    };

    let lua = mlua::Lua::new();
    let globals = lua.globals();

    let input = inputs
        .get(DEFAULT_INPUT_PORT)
        .or_else(|| if inputs.len() == 1 { inputs.values().next() } else { None })
        .cloned()
        .unwrap_or(Value::Null);
    globals.set("input", lua.to_value(&input).map_err(script_error)?).map_err(script_error)?;

    let inputs_object = Value::Object(
        inputs.iter().map(|(port, value)| (port.clone(), value.clone())).collect(),
    );
    globals
        .set("inputs", lua.to_value(&inputs_object).map_err(script_error)?)
        .map_err(script_error)?;

    let result: mlua::Value = lua.load(script).eval().map_err(script_error)?;
    lua.from_value(result).map_err(script_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::runtime::validator;
    use crate::workflow::types::ModuleInstance;
    use serde_json::json;

    fn node(type_id: &str, config: Value) -> GraphNode {
        let catalog = ModuleCatalog::builtin();
        let module_type = catalog.resolve(type_id).unwrap().clone();
        let instance: ModuleInstance =
            serde_json::from_value(json!({"id": "m1", "type": type_id, "config": config}))
                .unwrap();
        let config = validator::validate(&module_type.config_schema, &instance.config);
        GraphNode { instance, module_type, config, incoming: Vec::new(), outgoing: Vec::new() }
    }

    fn executor() -> ModuleExecutor {
        ModuleExecutor::new(
            Arc::new(ProviderRegistry::builtin()),
            Arc::new(CredentialStore::default()),
            Duration::from_secs(5),
        )
    }

    fn inputs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(port, value)| (port.to_string(), value.clone())).collect()
    }

    #[test]
    fn render_prompt_resolves_named_ports() {
        let inputs = inputs(&[("question", json!("why?")), ("context", json!("docs"))]);
        let rendered =
            render_prompt("Q: {{question}} C: {{context}}", &inputs, "ai1").unwrap();
        assert_eq!(rendered, "Q: why? C: docs");
    }

    #[test]
    fn render_prompt_sole_input_matches_any_placeholder() {
        let inputs = inputs(&[("input", json!("hello"))]);
        assert_eq!(render_prompt("{{x}}", &inputs, "ai1").unwrap(), "hello");
    }

    #[test]
    fn render_prompt_unresolved_placeholder_fails() {
        let inputs = inputs(&[("a", json!(1)), ("b", json!(2))]);
        let err = render_prompt("{{missing}}", &inputs, "ai1").unwrap_err();
        assert_eq!(
            err,
            ExecutorError::MissingInput { module_id: "ai1".to_string(), port: "missing".to_string() }
        );
    }

    #[test]
    fn render_prompt_keeps_unterminated_braces() {
        let inputs = inputs(&[("input", json!("v"))]);
        assert_eq!(render_prompt("open {{input", &inputs, "ai1").unwrap(), "open {{input");
    }

    #[test]
    fn render_prompt_stringifies_structured_values() {
        let inputs = inputs(&[("input", json!({"k": 1}))]);
        assert_eq!(render_prompt("{{input}}", &inputs, "ai1").unwrap(), r#"{"k":1}"#);
    }

    #[test]
    fn conditional_operators() {
        let check = |op: &str, operand: &str, value: Value| {
            evaluate_condition("c1", op, operand, &value).unwrap()
        };
        assert!(check("equals", "yes", json!("yes")));
        assert!(check("not_equals", "yes", json!("no")));
        assert!(check("contains", "ell", json!("hello")));
        assert!(check("not_contains", "xyz", json!("hello")));
        assert!(check("greater_than", "3", json!(5)));
        assert!(check("less_than", "3", json!("2.5")));
        assert!(!check("greater_than", "10", json!(5)));
    }

    #[test]
    fn conditional_rejects_non_numeric_comparisons() {
        let err = evaluate_condition("c1", "greater_than", "3", &json!("abc")).unwrap_err();
        assert!(matches!(err, ExecutorError::Condition { .. }));
        let err = evaluate_condition("c1", "greater_than", "abc", &json!(5)).unwrap_err();
        assert!(matches!(err, ExecutorError::Condition { .. }));
    }

    #[test]
    fn lua_transform_returns_converted_value() {
        let inputs = inputs(&[("input", json!("hello"))]);
        let result = run_lua_transform("t1", "return string.upper(input)", &inputs).unwrap();
        assert_eq!(result, json!("HELLO"));

        let result =
            run_lua_transform("t1", "return { doubled = inputs.input .. inputs.input }", &inputs)
                .unwrap();
        assert_eq!(result, json!({"doubled": "hellohello"}));
    }

    #[test]
    fn lua_transform_surfaces_script_errors() {
        let err = run_lua_transform("t1", "return nonsense(", &inputs(&[])).unwrap_err();
        assert!(matches!(err, ExecutorError::Script { .. }));
    }

    #[tokio::test]
    async fn input_module_prefers_runtime_value_over_default() {
        let executor = executor();
        let node = node("text-input", json!({"default": "fallback"}));

        let output = executor
            .execute(&node, BTreeMap::new(), Some(json!("supplied")))
            .await
            .unwrap();
        assert_eq!(output, ModuleOutput::Value(json!("supplied")));

        let output = executor.execute(&node, BTreeMap::new(), None).await.unwrap();
        assert_eq!(output, ModuleOutput::Value(json!("fallback")));
    }

    #[tokio::test]
    async fn input_module_without_value_or_default_fails() {
        let executor = executor();
        let node = node("text-input", json!({}));
        let err = executor.execute(&node, BTreeMap::new(), None).await.unwrap_err();
        assert_eq!(err, ExecutorError::MissingRuntimeInput { module_id: "m1".to_string() });
    }

    #[tokio::test]
    async fn ai_module_with_stub_provider_echoes_prompt() {
        let executor = executor();
        let node = node("openai-text", json!({"provider": "stub", "prompt": "say {{input}}"}));
        let output = executor
            .execute(&node, inputs(&[("input", json!("hi"))]), None)
            .await
            .unwrap();
        assert_eq!(output, ModuleOutput::Value(json!("say hi")));
    }

    #[tokio::test]
    async fn ai_module_without_credentials_fails() {
        let executor = executor();
        let node = node("openai-text", json!({}));
        let err = executor
            .execute(&node, inputs(&[("input", json!("hi"))]), None)
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::MissingCredentials { provider: "openai".to_string() });
    }

    #[tokio::test]
    async fn ai_module_with_unknown_provider_fails() {
        let executor = executor();
        let node = node("openai-text", json!({"provider": "galaxybrain"}));
        let err = executor
            .execute(&node, inputs(&[("input", json!("hi"))]), None)
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::UnknownProvider { provider: "galaxybrain".to_string() });
    }

    #[tokio::test]
    async fn conditional_routes_branches() {
        let executor = executor();
        let node = node("conditional", json!({"operator": "contains", "operand": "yes"}));

        let output = executor
            .execute(&node, inputs(&[("input", json!("yes please"))]), None)
            .await
            .unwrap();
        assert_eq!(
            output,
            ModuleOutput::Branch { port: "true".to_string(), value: json!("yes please") }
        );

        let output = executor
            .execute(&node, inputs(&[("input", json!("nope"))]), None)
            .await
            .unwrap();
        assert_eq!(
            output,
            ModuleOutput::Branch { port: "false".to_string(), value: json!("nope") }
        );
    }

    #[tokio::test]
    async fn output_module_passes_through_single_input() {
        let executor = executor();
        let node = node("text-output", json!({}));

        let output = executor
            .execute(&node, inputs(&[("input", json!("final"))]), None)
            .await
            .unwrap();
        assert_eq!(output, ModuleOutput::Value(json!("final")));

        let err = executor.execute(&node, BTreeMap::new(), None).await.unwrap_err();
        assert_eq!(
            err,
            ExecutorError::MissingInput { module_id: "m1".to_string(), port: "input".to_string() }
        );
    }

    #[tokio::test]
    async fn invalid_config_fails_the_module() {
        let executor = executor();
        let node = node("openai-text", json!({"temperature": 99.0}));
        let err = executor
            .execute(&node, inputs(&[("input", json!("hi"))]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidConfig(_)));
    }
}
