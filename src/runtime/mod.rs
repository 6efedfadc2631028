/// Runtime Execution Engine
///
/// This module provides the workflow execution engine. It handles:
/// - Config schema validation against each module type's declared schema
/// - Converting workflows into validated execution graphs
/// - Deterministic topological execution with failure isolation
/// - Per-category module executors, including AI provider calls

// Engine error taxonomy
pub mod error;

// Pure config schema validation
pub mod validator;

// Execution graph construction and structural validation
pub mod graph;

// Run-scoped state and the aggregated run result
pub mod context;

// Individual module execution handlers
pub mod executor;

// Topological scheduler driving one run
pub mod engine;

// Re-export main types
pub use context::{ExecutionContext, ModuleOutput, ModuleStatus, RunResult, RunStatus, SkipCause};
pub use engine::ExecutionEngine;
pub use error::{ConfigError, ExecutorError, GraphError};
pub use executor::ModuleExecutor;
pub use graph::ExecutionGraph;
