/// Flowweave: visual AI workflow execution engine
///
/// Main entry point for the flowweave server. Initializes configuration and
/// starts the HTTP server with workflow management and execution endpoints.

use flowweave::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Module-type catalog at /api/module-types
/// - Workflow management API at /api/workflows/*
/// - Workflow execution at /api/workflows/{id}/execute
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults plus FLOWWEAVE_* env overrides)
    let config = Config::default();

    // Start the server
    start_server(config).await?;

    Ok(())
}
