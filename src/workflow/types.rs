/// Core workflow type definitions
///
/// Defines the structures the editor persists: workflows, module instances,
/// and the connections between their ports. These types are serialized to and
/// from JSON and must round-trip losslessly - ids as strings, positions as
/// {x, y} pairs, configs as open mappings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete workflow definition containing modules and their connections
///
/// Workflows are stored as JSON in SQLite and compiled into an execution
/// graph when a run is requested. The connection graph restricted to modules
/// must be acyclic; that invariant is enforced at graph build, not here, so
/// the editor can save drafts freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Modules placed on the canvas, in editor order
    #[serde(default)]
    pub modules: Vec<ModuleInstance>,
    /// Directed connections between module ports
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// One module placed on the canvas
///
/// The `config` mapping is open JSON; it is validated against the module
/// type's declared schema at graph build. Unknown fields survive the
/// round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInstance {
    /// Unique module identifier within the workflow
    pub id: String,
    /// Module-type id resolved against the catalog (e.g. "openai-text")
    #[serde(rename = "type")]
    pub type_id: String,
    /// Display name shown on the canvas
    #[serde(default)]
    pub name: String,
    /// Per-instance configuration, field name -> value
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Canvas position; irrelevant to execution, carried for round-trip
    #[serde(default)]
    pub position: Position,
}

/// 2-D canvas position of a module
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A directed edge carrying one value between module ports
///
/// Handles are optional: a missing source handle means the producer's default
/// output port, a missing target handle the consumer's default input port.
/// Each target port accepts at most one incoming connection; fan-out from a
/// source port is unrestricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection identifier
    #[serde(default)]
    pub id: String,
    /// Producing module id
    pub source: String,
    /// Named output port on the producer, when not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Consuming module id
    pub target: String,
    /// Named input port on the consumer, when not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}
