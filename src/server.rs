/// Server setup and initialization
///
/// Wires together all components: storage, registry, catalog, providers,
/// execution engine, and HTTP routes. Provides the main application factory
/// function for creating the Axum app.

use crate::{
    api::{
        execute::{create_execute_routes, ExecuteAppState},
        workflows::{create_workflow_routes, AppState},
    },
    catalog::ModuleCatalog,
    config::Config,
    providers::{CredentialStore, ProviderRegistry},
    runtime::{engine::ExecutionEngine, executor::ModuleExecutor},
    workflow::{registry::WorkflowRegistry, storage::WorkflowStorage},
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Create the main Axum application with all routes
///
/// Initializes all components and wires them together into a complete
/// application: database pool, workflow registry, provider clients, the
/// execution engine, and the HTTP routes.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("🗄️ Connecting workflow database: {}", config.database.url);
    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open workflow database: {}", e))?;

    let storage = WorkflowStorage::new(pool);
    storage.init_schema().await?;

    tracing::info!("📦 Loading module-type catalog");
    let catalog = Arc::new(ModuleCatalog::builtin());

    tracing::info!("📊 Initializing workflow registry");
    let registry = Arc::new(WorkflowRegistry::new(storage.clone(), Arc::clone(&catalog)));
    registry.init_from_storage().await?;

    tracing::info!("🔑 Loading provider credentials from environment");
    let providers = Arc::new(ProviderRegistry::builtin());
    let credentials = Arc::new(CredentialStore::from_env());

    tracing::info!(
        "⚙️ Initializing execution engine (provider timeout: {}s, retries: {})",
        config.engine.provider_timeout_secs,
        config.engine.max_provider_retries
    );
    let executor = Arc::new(ModuleExecutor::new(
        providers,
        credentials,
        Duration::from_secs(config.engine.provider_timeout_secs),
    ));
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&catalog),
        executor,
        config.engine,
    ));

    let app_state = AppState { storage, registry, catalog };
    let execute_state = ExecuteAppState { app_state: app_state.clone(), engine };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(app_state))
        .merge(create_execute_routes().with_state(execute_state));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting flowweave server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
