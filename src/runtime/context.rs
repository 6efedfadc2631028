/// Run-scoped execution state
///
/// The ExecutionContext holds everything one run accumulates: the caller's
/// runtime inputs, every module's produced output, and the per-module status
/// map. It lives for exactly one execute call and is folded into a RunResult
/// at the end. Only the scheduler writes to it, from its single coordinating
/// point, so executors stay free of shared mutable state.

use crate::catalog::ModuleCategory;
use crate::runtime::error::ExecutorError;
use crate::runtime::graph::ExecutionGraph;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// What one module produced
///
/// Single-output modules publish a plain value that satisfies any requested
/// source port - the editor may label the handle however it likes. Logic
/// modules publish onto exactly one named branch port; consumers keyed to a
/// different branch see nothing, which is what drives branch skipping.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutput {
    /// One value, available on every output port
    Value(Value),
    /// One value, available only on the named branch port
    Branch { port: String, value: Value },
}

/// Why a module was skipped instead of executed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum SkipCause {
    /// An upstream dependency failed or was itself skipped
    UpstreamFailure { module_id: String },
    /// An upstream logic module routed down a different branch
    BranchNotTaken { module_id: String, port: String },
}

/// Final state of one module within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    Succeeded,
    Failed { error: ExecutorError },
    Skipped { cause: SkipCause },
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Aggregated result of one workflow run
///
/// Deliberately free of timestamps and generated ids: the same workflow with
/// the same inputs and a deterministic provider produces a bitwise-identical
/// result. Telemetry wrapping (run ids, durations) happens at the API layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Id of the executed workflow
    pub workflow_id: String,
    /// Success iff every Output module produced a value or sat on an
    /// untaken branch; a run with zero Output modules is vacuously successful
    pub status: RunStatus,
    /// Output-module id -> produced value, for modules that succeeded
    pub outputs: BTreeMap<String, Value>,
    /// Every module id -> its final status
    pub modules: BTreeMap<String, ModuleStatus>,
}

/// Mutable state of one in-flight run
#[derive(Debug)]
pub struct ExecutionContext {
    workflow_id: String,
    runtime_inputs: HashMap<String, Value>,
    outputs: HashMap<String, ModuleOutput>,
    statuses: BTreeMap<String, ModuleStatus>,
}

impl ExecutionContext {
    /// Fresh context for one execute call
    pub fn new(workflow_id: String, runtime_inputs: HashMap<String, Value>) -> Self {
        Self {
            workflow_id,
            runtime_inputs,
            outputs: HashMap::new(),
            statuses: BTreeMap::new(),
        }
    }

    /// Caller-supplied runtime value bound to an Input module id
    pub fn runtime_input(&self, module_id: &str) -> Option<&Value> {
        self.runtime_inputs.get(module_id)
    }

    /// Record a successful module together with what it produced
    pub fn record_success(&mut self, module_id: &str, output: ModuleOutput) {
        self.outputs.insert(module_id.to_string(), output);
        self.statuses.insert(module_id.to_string(), ModuleStatus::Succeeded);
    }

    /// Record a failed module
    pub fn record_failure(&mut self, module_id: &str, error: ExecutorError) {
        self.statuses.insert(module_id.to_string(), ModuleStatus::Failed { error });
    }

    /// Record a skipped module
    pub fn record_skip(&mut self, module_id: &str, cause: SkipCause) {
        self.statuses.insert(module_id.to_string(), ModuleStatus::Skipped { cause });
    }

    /// Final status of a module, once recorded
    pub fn status(&self, module_id: &str) -> Option<&ModuleStatus> {
        self.statuses.get(module_id)
    }

    /// Value a module produced on the given output port, if any
    pub fn port_value(&self, module_id: &str, port: &str) -> Option<&Value> {
        match self.outputs.get(module_id)? {
            ModuleOutput::Value(value) => Some(value),
            ModuleOutput::Branch { port: taken, value } => (taken == port).then_some(value),
        }
    }

    /// Fold the finished run into its aggregated result
    pub fn into_result(self, graph: &ExecutionGraph) -> RunResult {
        let mut outputs = BTreeMap::new();
        let mut status = RunStatus::Success;

        for (module_id, node) in graph.nodes() {
            if node.category() != ModuleCategory::Output {
                continue;
            }
            match self.statuses.get(module_id) {
                Some(ModuleStatus::Succeeded) => {
                    if let Some(ModuleOutput::Value(value)) = self.outputs.get(module_id) {
                        outputs.insert(module_id.clone(), value.clone());
                    }
                }
                // An output on an untaken branch was never requested
                Some(ModuleStatus::Skipped { cause: SkipCause::BranchNotTaken { .. } }) => {}
                _ => status = RunStatus::Failed,
            }
        }

        RunResult {
            workflow_id: self.workflow_id,
            status,
            outputs,
            modules: self.statuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_values_satisfy_any_port() {
        let mut ctx = ExecutionContext::new("wf".to_string(), HashMap::new());
        ctx.record_success("m1", ModuleOutput::Value(json!("hello")));

        assert_eq!(ctx.port_value("m1", "output"), Some(&json!("hello")));
        assert_eq!(ctx.port_value("m1", "text"), Some(&json!("hello")));
    }

    #[test]
    fn branch_values_match_strictly() {
        let mut ctx = ExecutionContext::new("wf".to_string(), HashMap::new());
        ctx.record_success(
            "cond",
            ModuleOutput::Branch { port: "true".to_string(), value: json!("yes") },
        );

        assert_eq!(ctx.port_value("cond", "true"), Some(&json!("yes")));
        assert_eq!(ctx.port_value("cond", "false"), None);
        assert_eq!(ctx.port_value("ghost", "true"), None);
    }

    #[test]
    fn statuses_serialize_tagged() {
        let status = ModuleStatus::Skipped {
            cause: SkipCause::UpstreamFailure { module_id: "a".to_string() },
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["cause"]["cause"], "upstream_failure");
        assert_eq!(json["cause"]["module_id"], "a");
    }
}
