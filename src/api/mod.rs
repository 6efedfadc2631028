/// HTTP API Layer
///
/// This module provides the REST API endpoints for workflow management
/// and execution. It handles:
/// - Workflow CRUD operations with hot-reload
/// - The module-type catalog listing
/// - The execute entry point

// Workflow management endpoints (POST/GET/PUT/DELETE) and catalog listing
pub mod workflows;

// Workflow execution endpoint
pub mod execute;

// Re-export router builders
pub use execute::create_execute_routes;
pub use workflows::create_workflow_routes;
