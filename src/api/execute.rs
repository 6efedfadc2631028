/// Workflow execution endpoint
///
/// The editor's "run" action lands here: look the workflow up in the
/// hot-reload registry, hand it to the engine with the caller's runtime
/// inputs, and return the full run result - including per-module statuses,
/// so the editor can paint every node's outcome.

use crate::api::workflows::AppState;
use crate::runtime::engine::ExecutionEngine;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{post, Router},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Extended application state with the execution engine
#[derive(Clone)]
pub struct ExecuteAppState {
    /// Base app state with storage, registry, and catalog
    pub app_state: AppState,
    /// Execution engine for running workflows
    pub engine: Arc<ExecutionEngine>,
}

/// Request body for the execute endpoint
///
/// Inputs are keyed by module id; values for modules that are not
/// Input-category are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
}

/// Create the execution route
pub fn create_execute_routes() -> Router<ExecuteAppState> {
    Router::new().route("/api/workflows/{id}/execute", post(execute_workflow))
}

/// Execute a workflow against caller-supplied runtime inputs
///
/// POST /api/workflows/:id/execute
/// Body: { "inputs": { "in1": "hello" } }
///
/// 404 when the workflow is unknown, 422 with the structural error when the
/// graph is invalid. Execution failures are NOT an HTTP error: the run
/// result always comes back with per-module statuses, even when every path
/// failed, so the caller can tell "no outputs configured" from "all failed".
async fn execute_workflow(
    State(state): State<ExecuteAppState>,
    Path(workflow_id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let run_id = uuid::Uuid::new_v4();
    let started_at = chrono::Utc::now();
    tracing::info!(
        "📥 Execute request for workflow '{}' (run {}, {} inputs)",
        workflow_id,
        run_id,
        request.inputs.len()
    );

    let compiled = state.app_state.registry.get_workflow(&workflow_id).ok_or_else(|| {
        tracing::warn!("❌ Execute called for unknown workflow: {}", workflow_id);
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Workflow not found: {}", workflow_id) })),
        )
    })?;

    match state.engine.execute(&compiled.workflow, request.inputs).await {
        Ok(result) => {
            // Telemetry wraps the result; the result itself stays deterministic
            let mut envelope = serde_json::to_value(&result).unwrap_or_else(|_| json!({}));
            if let Some(body) = envelope.as_object_mut() {
                body.insert("run_id".to_string(), json!(run_id.to_string()));
                body.insert("started_at".to_string(), json!(started_at.to_rfc3339()));
            }
            Ok(Json(envelope))
        }
        Err(graph_error) => {
            tracing::warn!(
                "❌ Workflow '{}' failed structural validation: {}",
                workflow_id,
                graph_error
            );
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": graph_error.to_string(),
                    "detail": graph_error,
                })),
            ))
        }
    }
}
