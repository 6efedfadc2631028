/// Error taxonomy of the execution engine
///
/// Three layers with different blast radii:
/// - GraphError: structural, fatal for the whole run before anything executes
/// - ConfigError: per-module schema violation, fails only that module
/// - ExecutorError: per-module runtime failure, propagated to dependents as
///   skips while sibling branches keep running
///
/// Everything serializes so a RunResult is a complete, self-describing JSON
/// document the editor can render without further lookups.

use crate::catalog::FieldKind;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Structural workflow defects detected at graph build
///
/// Any of these aborts the run before a single module executes.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphError {
    #[error("duplicate module id '{module_id}'")]
    DuplicateModuleId { module_id: String },

    #[error("connection '{connection_id}' references unknown module '{module_id}'")]
    DanglingConnection {
        connection_id: String,
        module_id: String,
    },

    #[error("module '{module_id}' has unknown type '{type_id}'")]
    UnknownModuleType { module_id: String, type_id: String },

    #[error("input port '{port}' on module '{module_id}' has more than one incoming connection")]
    FanInViolation { module_id: String, port: String },

    #[error("workflow contains a cycle: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
}

/// Why a config value was rejected against its declared field schema
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConfigErrorReason {
    #[error("expected a {expected} value, got {got}")]
    TypeMismatch { expected: FieldKind, got: String },

    #[error("value is not one of the allowed enum values")]
    InvalidEnumValue { allowed: Vec<Value> },

    #[error("value is outside the declared range")]
    OutOfRange { min: Option<f64>, max: Option<f64> },
}

/// A module configuration that violates its type's schema
///
/// Detected at graph build; recorded on the node and surfaced as that
/// module's Failed status when the run reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("invalid config field '{field}': {reason}")]
pub struct ConfigError {
    pub field: String,
    pub reason: ConfigErrorReason,
}

/// Runtime failure of a single module
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorError {
    #[error("no runtime input supplied for input module '{module_id}'")]
    MissingRuntimeInput { module_id: String },

    #[error("module '{module_id}' is missing a value for input '{port}'")]
    MissingInput { module_id: String, port: String },

    #[error("no API key configured for provider '{provider}'")]
    MissingCredentials { provider: String },

    #[error("unknown AI provider '{provider}'")]
    UnknownProvider { provider: String },

    #[error("provider '{provider}' request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("provider '{provider}' call exceeded the {timeout_secs}s deadline")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("condition failed in module '{module_id}': {message}")]
    Condition { module_id: String, message: String },

    #[error("script failed in module '{module_id}': {message}")]
    Script { module_id: String, message: String },

    #[error("module type '{type_id}' has no executable behavior")]
    UnsupportedType { type_id: String },

    #[error("module configuration rejected: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl ExecutorError {
    /// Whether retrying the same call can plausibly succeed
    ///
    /// Transport failures, rate limits, server errors, and timeouts qualify;
    /// everything else is deterministic and retrying would only repeat it.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutorError::Provider { status, .. } => match status {
                None => true,
                Some(429) => true,
                Some(code) => *code >= 500,
            },
            ExecutorError::Timeout { .. } => true,
            _ => false,
        }
    }
}
