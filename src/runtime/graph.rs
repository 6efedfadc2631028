/// Execution graph construction and validation
///
/// Converts a persisted workflow into an in-memory directed graph keyed by
/// module id, with every structural invariant checked up front: module ids
/// are unique, every connection endpoint exists, every module type resolves
/// in the catalog, no input port has more than one incoming connection, and
/// the graph is acyclic. Per-module config validation also happens here so
/// the scheduler can treat a bad config as that module's own failure.
///
/// Traversal goes through id lookups only; connections are stored as plain
/// id pairs, which keeps the structure serializable and makes cycle
/// detection an ordinary graph algorithm.

use crate::catalog::{ModuleCatalog, ModuleCategory, ModuleType};
use crate::runtime::error::{ConfigError, GraphError};
use crate::runtime::validator::{self, ValidatedConfig};
use crate::workflow::types::{ModuleInstance, Workflow};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Default output port of a module whose connection names no source handle
pub const DEFAULT_OUTPUT_PORT: &str = "output";
/// Default input port of a module whose connection names no target handle
pub const DEFAULT_INPUT_PORT: &str = "input";

/// A connection with both port names resolved to concrete values
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConnection {
    pub id: String,
    pub source: String,
    pub source_port: String,
    pub target: String,
    pub target_port: String,
}

/// One module with everything execution needs resolved
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The persisted module instance
    pub instance: ModuleInstance,
    /// Catalog definition of the module's type
    pub module_type: ModuleType,
    /// Validated config, or the schema violation that fails this module
    pub config: Result<ValidatedConfig, ConfigError>,
    /// Incoming connections, ordered by target port
    pub incoming: Vec<ResolvedConnection>,
    /// Outgoing connections, ordered by source port then target
    pub outgoing: Vec<ResolvedConnection>,
}

impl GraphNode {
    pub fn id(&self) -> &str {
        &self.instance.id
    }

    pub fn category(&self) -> ModuleCategory {
        self.module_type.category
    }
}

/// Validated, ready-to-run form of a workflow
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    nodes: HashMap<String, GraphNode>,
}

impl ExecutionGraph {
    /// Build and validate the execution graph for a workflow
    ///
    /// Structural defects are fatal and returned as GraphError before any
    /// module runs. A workflow with zero Output modules builds fine - it
    /// just produces an empty result.
    pub fn build(workflow: &Workflow, catalog: &ModuleCatalog) -> Result<Self, GraphError> {
        let mut nodes: HashMap<String, GraphNode> = HashMap::new();

        for instance in &workflow.modules {
            if nodes.contains_key(&instance.id) {
                return Err(GraphError::DuplicateModuleId {
                    module_id: instance.id.clone(),
                });
            }

            let module_type = catalog.resolve(&instance.type_id).cloned().ok_or_else(|| {
                GraphError::UnknownModuleType {
                    module_id: instance.id.clone(),
                    type_id: instance.type_id.clone(),
                }
            })?;

            let config = validator::validate(&module_type.config_schema, &instance.config);
            if let Ok(validated) = &config {
                for field in validated.warnings() {
                    tracing::warn!(
                        "⚠️ Module '{}' carries config field '{}' unknown to type '{}'",
                        instance.id,
                        field,
                        module_type.id
                    );
                }
            }

            nodes.insert(
                instance.id.clone(),
                GraphNode {
                    instance: instance.clone(),
                    module_type,
                    config,
                    incoming: Vec::new(),
                    outgoing: Vec::new(),
                },
            );
        }

        // Wire connections, rejecting dangling endpoints and fan-in > 1
        let mut occupied_ports: HashSet<(String, String)> = HashSet::new();
        for connection in &workflow.connections {
            for endpoint in [&connection.source, &connection.target] {
                if !nodes.contains_key(endpoint) {
                    return Err(GraphError::DanglingConnection {
                        connection_id: connection.id.clone(),
                        module_id: endpoint.clone(),
                    });
                }
            }

            let resolved = ResolvedConnection {
                id: connection.id.clone(),
                source: connection.source.clone(),
                source_port: connection
                    .source_handle
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OUTPUT_PORT.to_string()),
                target: connection.target.clone(),
                target_port: connection
                    .target_handle
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INPUT_PORT.to_string()),
            };

            let port_key = (resolved.target.clone(), resolved.target_port.clone());
            if !occupied_ports.insert(port_key) {
                return Err(GraphError::FanInViolation {
                    module_id: resolved.target,
                    port: resolved.target_port,
                });
            }

            if let Some(source) = nodes.get_mut(&resolved.source) {
                source.outgoing.push(resolved.clone());
            }
            if let Some(target) = nodes.get_mut(&resolved.target) {
                target.incoming.push(resolved);
            }
        }

        for node in nodes.values_mut() {
            node.incoming
                .sort_by(|a, b| a.target_port.cmp(&b.target_port).then(a.source.cmp(&b.source)));
            node.outgoing
                .sort_by(|a, b| a.source_port.cmp(&b.source_port).then(a.target.cmp(&b.target)));
        }

        detect_cycle(&nodes)?;

        Ok(Self { nodes })
    }

    /// Look up one node by module id
    pub fn node(&self, module_id: &str) -> Option<&GraphNode> {
        self.nodes.get(module_id)
    }

    /// All nodes, keyed by module id
    pub fn nodes(&self) -> impl Iterator<Item = (&String, &GraphNode)> {
        self.nodes.iter()
    }

    /// Number of modules in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reject cyclic graphs, reporting the member module ids for diagnostics
fn detect_cycle(nodes: &HashMap<String, GraphNode>) -> Result<(), GraphError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for id in nodes.keys() {
        let index = graph.add_node(id.clone());
        indices.insert(id.as_str(), index);
    }
    for node in nodes.values() {
        for connection in &node.outgoing {
            let from = indices[connection.source.as_str()];
            let to = indices[connection.target.as_str()];
            graph.add_edge(from, to, ());
        }
    }

    if toposort(&graph, None).is_ok() {
        return Ok(());
    }

    // Strongly connected components of size > 1 (or self loops) are the cycle
    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || (component.len() == 1 && graph.find_edge(component[0], component[0]).is_some());
        if is_cycle {
            let mut cycle: Vec<String> =
                component.iter().map(|index| graph[*index].clone()).collect();
            cycle.sort();
            return Err(GraphError::CycleDetected { cycle });
        }
    }

    // toposort failed, so a cycle must exist
    Err(GraphError::CycleDetected { cycle: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::builtin()
    }

    fn workflow(value: serde_json::Value) -> Workflow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_a_linear_workflow() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "linear",
            "modules": [
                {"id": "in1", "type": "text-input"},
                {"id": "ai1", "type": "openai-text", "config": {"provider": "stub"}},
                {"id": "out1", "type": "text-output"}
            ],
            "connections": [
                {"id": "c1", "source": "in1", "target": "ai1"},
                {"id": "c2", "source": "ai1", "target": "out1"}
            ]
        }));
        let graph = ExecutionGraph::build(&workflow, &catalog()).unwrap();
        assert_eq!(graph.len(), 3);

        let ai1 = graph.node("ai1").unwrap();
        assert_eq!(ai1.incoming.len(), 1);
        assert_eq!(ai1.incoming[0].source_port, DEFAULT_OUTPUT_PORT);
        assert_eq!(ai1.incoming[0].target_port, DEFAULT_INPUT_PORT);
        assert_eq!(ai1.category(), ModuleCategory::AiModel);
    }

    #[test]
    fn duplicate_module_ids_are_rejected() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "dup",
            "modules": [
                {"id": "m1", "type": "text-input"},
                {"id": "m1", "type": "text-output"}
            ]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(err, GraphError::DuplicateModuleId { module_id: "m1".to_string() });
    }

    #[test]
    fn dangling_connection_is_rejected() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "dangling",
            "modules": [{"id": "in1", "type": "text-input"}],
            "connections": [{"id": "c1", "source": "in1", "target": "ghost"}]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingConnection {
                connection_id: "c1".to_string(),
                module_id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn unknown_module_type_is_rejected() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "unknown",
            "modules": [{"id": "m1", "type": "quantum-oracle"}]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownModuleType {
                module_id: "m1".to_string(),
                type_id: "quantum-oracle".to_string()
            }
        );
    }

    #[test]
    fn fan_in_violation_is_rejected_not_resolved() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "fanin",
            "modules": [
                {"id": "a", "type": "text-input"},
                {"id": "b", "type": "text-input"},
                {"id": "out1", "type": "text-output"}
            ],
            "connections": [
                {"id": "c1", "source": "a", "target": "out1"},
                {"id": "c2", "source": "b", "target": "out1"}
            ]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(
            err,
            GraphError::FanInViolation {
                module_id: "out1".to_string(),
                port: DEFAULT_INPUT_PORT.to_string()
            }
        );
    }

    #[test]
    fn distinct_target_ports_allow_multiple_inputs() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "two-ports",
            "modules": [
                {"id": "a", "type": "text-input"},
                {"id": "b", "type": "text-input"},
                {"id": "ai1", "type": "openai-text"}
            ],
            "connections": [
                {"id": "c1", "source": "a", "target": "ai1", "target_handle": "context"},
                {"id": "c2", "source": "b", "target": "ai1", "target_handle": "question"}
            ]
        }));
        let graph = ExecutionGraph::build(&workflow, &catalog()).unwrap();
        let ports: Vec<&str> = graph
            .node("ai1")
            .unwrap()
            .incoming
            .iter()
            .map(|c| c.target_port.as_str())
            .collect();
        assert_eq!(ports, ["context", "question"]);
    }

    #[test]
    fn cycle_is_reported_with_member_ids() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "cyclic",
            "modules": [
                {"id": "a", "type": "transform"},
                {"id": "b", "type": "transform"},
                {"id": "c", "type": "text-input"}
            ],
            "connections": [
                {"id": "c1", "source": "a", "target": "b"},
                {"id": "c2", "source": "b", "target": "a", "target_handle": "loop"},
                {"id": "c3", "source": "c", "target": "a"}
            ]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected { cycle: vec!["a".to_string(), "b".to_string()] }
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "selfloop",
            "modules": [{"id": "a", "type": "transform"}],
            "connections": [{"id": "c1", "source": "a", "target": "a"}]
        }));
        let err = ExecutionGraph::build(&workflow, &catalog()).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { cycle: vec!["a".to_string()] });
    }

    #[test]
    fn config_violation_is_stored_per_module_not_fatal() {
        let workflow = workflow(json!({
            "id": "wf",
            "name": "badconfig",
            "modules": [
                {"id": "ai1", "type": "openai-text", "config": {"temperature": 9.0}}
            ]
        }));
        let graph = ExecutionGraph::build(&workflow, &catalog()).unwrap();
        assert!(graph.node("ai1").unwrap().config.is_err());
    }
}
