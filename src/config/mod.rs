/// Configuration management for the flowweave server
///
/// Handles server binding, database location, and the engine's execution
/// parameters. Every value has an environment-variable override for
/// container deployment.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Execution engine parameters
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g. "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; mode=rwc creates the file when missing
    pub url: String,
}

/// Execution engine parameters
///
/// These are deliberately configuration rather than constants: provider
/// latency tolerance and retry appetite differ per deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for each individual AI provider call, in seconds
    pub provider_timeout_secs: u64,
    /// How many times a transient provider failure is retried
    pub max_provider_retries: u32,
    /// Base backoff between retries, doubled per attempt, in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWWEAVE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("FLOWWEAVE_PORT")
                    .unwrap_or_else(|_| "3010".to_string())
                    .parse()
                    .unwrap_or(3010),
            },
            database: DatabaseConfig {
                url: std::env::var("FLOWWEAVE_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://flowweave.db?mode=rwc".to_string()),
            },
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: env_u64("FLOWWEAVE_PROVIDER_TIMEOUT_SECS", 30),
            max_provider_retries: env_u64("FLOWWEAVE_PROVIDER_RETRIES", 2) as u32,
            retry_backoff_ms: env_u64("FLOWWEAVE_RETRY_BACKOFF_MS", 500),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
