/// Topological workflow execution engine
///
/// Drives one run: builds the validated execution graph, computes a
/// deterministic evaluation order (Kahn's algorithm, ties broken by
/// ascending module id), routes values between ports, applies the bounded
/// retry policy around AI calls, and assembles the final RunResult.
///
/// Failure policy: a failed module never aborts the run. Its transitive
/// dependents are marked skipped while independent branches keep executing,
/// so Output modules off the failing path still produce valid data.

use crate::catalog::{ModuleCatalog, ModuleCategory};
use crate::config::EngineConfig;
use crate::runtime::context::{ExecutionContext, ModuleOutput, RunResult, SkipCause};
use crate::runtime::error::{ExecutorError, GraphError};
use crate::runtime::executor::ModuleExecutor;
use crate::runtime::graph::{ExecutionGraph, GraphNode};
use crate::workflow::types::Workflow;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// What the scheduler decided to do with one ready module
enum Step {
    Run(BTreeMap<String, Value>),
    Skip(SkipCause),
}

/// DAG execution engine orchestrating one workflow run at a time
#[derive(Debug)]
pub struct ExecutionEngine {
    /// Module-type catalog used to resolve and validate workflows
    catalog: Arc<ModuleCatalog>,
    /// Executor handling individual module invocations
    executor: Arc<ModuleExecutor>,
    /// Retry and timeout parameters
    config: EngineConfig,
}

impl ExecutionEngine {
    /// Create new execution engine over shared components
    pub fn new(catalog: Arc<ModuleCatalog>, executor: Arc<ModuleExecutor>, config: EngineConfig) -> Self {
        Self { catalog, executor, config }
    }

    /// Execute a workflow against a set of runtime inputs
    ///
    /// Structural defects fail the whole call before any module runs.
    /// Everything else - provider failures, bad configs, missing inputs -
    /// is local to a module and lands in the returned status map.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        runtime_inputs: HashMap<String, Value>,
    ) -> Result<RunResult, GraphError> {
        let run_start = std::time::Instant::now();
        tracing::info!(
            "🚀 Starting run of workflow '{}' ({} modules, {} connections)",
            workflow.id,
            workflow.modules.len(),
            workflow.connections.len()
        );

        let graph = ExecutionGraph::build(workflow, &self.catalog)?;
        let mut ctx = ExecutionContext::new(workflow.id.clone(), runtime_inputs);

        // Kahn's algorithm over the arena. The ready set is ordered by module
        // id; two independent branches therefore execute in a reproducible
        // sequence, which is part of the engine's observable contract.
        let mut indegree: HashMap<String, usize> = graph
            .nodes()
            .map(|(id, node)| (id.clone(), node.incoming.len()))
            .collect();
        let mut ready: BTreeSet<String> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.clone())
            .collect();

        let mut step_number = 0usize;
        while let Some(module_id) = ready.pop_first() {
            let node = match graph.node(&module_id) {
                Some(node) => node,
                None => continue,
            };
            step_number += 1;
            tracing::debug!(
                "📍 Step {}/{}: module '{}' (type: {})",
                step_number,
                graph.len(),
                module_id,
                node.module_type.id
            );

            match self.prepare(node, &ctx) {
                Step::Skip(cause) => {
                    tracing::debug!("⏭️ Skipping module '{}'", module_id);
                    ctx.record_skip(&module_id, cause);
                }
                Step::Run(inputs) => {
                    let runtime_input = (node.category() == ModuleCategory::Input)
                        .then(|| ctx.runtime_input(&module_id).cloned())
                        .flatten();
                    match self.run_module(node, inputs, runtime_input).await {
                        Ok(output) => ctx.record_success(&module_id, output),
                        Err(error) => ctx.record_failure(&module_id, error),
                    }
                }
            }

            // Release dependents regardless of outcome so sibling branches drain
            for connection in &node.outgoing {
                if let Some(degree) = indegree.get_mut(&connection.target) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(connection.target.clone());
                    }
                }
            }
        }

        let result = ctx.into_result(&graph);
        tracing::info!(
            "🎉 Run of workflow '{}' finished with status {:?} in {:?} ({} outputs)",
            workflow.id,
            result.status,
            run_start.elapsed(),
            result.outputs.len()
        );
        Ok(result)
    }

    /// Decide whether a ready module runs, and with which inputs
    ///
    /// Upstream statuses are final by the time a module becomes ready, so
    /// this is a pure lookup: any failed or skipped upstream skips the
    /// module; a succeeded upstream that never produced the referenced port
    /// means a logic branch was not taken.
    fn prepare(&self, node: &GraphNode, ctx: &ExecutionContext) -> Step {
        use crate::runtime::context::ModuleStatus;

        let mut inputs = BTreeMap::new();
        for connection in &node.incoming {
            match ctx.status(&connection.source) {
                Some(ModuleStatus::Succeeded) => {
                    match ctx.port_value(&connection.source, &connection.source_port) {
                        Some(value) => {
                            inputs.insert(connection.target_port.clone(), value.clone());
                        }
                        None => {
                            return Step::Skip(SkipCause::BranchNotTaken {
                                module_id: connection.source.clone(),
                                port: connection.source_port.clone(),
                            });
                        }
                    }
                }
                _ => {
                    return Step::Skip(SkipCause::UpstreamFailure {
                        module_id: connection.source.clone(),
                    });
                }
            }
        }
        Step::Run(inputs)
    }

    /// Invoke the executor, retrying transient AI failures a bounded number
    /// of times with exponential backoff
    async fn run_module(
        &self,
        node: &GraphNode,
        inputs: BTreeMap<String, Value>,
        runtime_input: Option<Value>,
    ) -> Result<ModuleOutput, ExecutorError> {
        let max_retries = if node.category() == ModuleCategory::AiModel {
            self.config.max_provider_retries
        } else {
            0
        };

        let mut attempt: u32 = 0;
        loop {
            let result = self
                .executor
                .execute(node, inputs.clone(), runtime_input.clone())
                .await;
            match result {
                Err(error) if attempt < max_retries && error.is_retryable() => {
                    let backoff_ms = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(1u64 << attempt.min(16));
                    tracing::warn!(
                        "🔁 Module '{}' attempt {}/{} failed ({}), retrying in {}ms",
                        node.id(),
                        attempt + 1,
                        max_retries + 1,
                        error,
                        backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
