/// AI Provider Layer
///
/// Abstracts distinct vendor APIs behind one capability: build a completion
/// request, send it, get text (or an image URL) back. Credentials are
/// injected here, read-only, and never flow through the engine itself.
/// Clients are shared and safe for concurrent use across modules and runs.

// OpenAI chat completion and image generation clients
pub mod openai;

// Anthropic messages client
pub mod anthropic;

// Deterministic echo provider for tests and keyless dry-runs
pub mod stub;

use crate::runtime::error::ExecutorError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use anthropic::AnthropicClient;
pub use openai::{OpenAiClient, OpenAiImageClient};
pub use stub::StubProvider;

/// One provider call, assembled by the AI module executor
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Provider-side model name
    pub model: String,
    /// Fully rendered prompt text
    pub prompt: String,
    /// Sampling temperature, when configured
    pub temperature: Option<f64>,
    /// Response token cap, when configured
    pub max_tokens: Option<u64>,
    /// Provider-specific extras (e.g. DALL-E's `size`)
    pub options: BTreeMap<String, Value>,
}

/// What a provider call produced
///
/// Image providers put the generated image URL here.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
}

/// Capability seam over external AI vendors
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Whether calls must carry an API key
    fn requires_api_key(&self) -> bool {
        true
    }

    /// Send one request; the deadline and retry policy live with the caller
    async fn send(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<CompletionResponse, ExecutorError>;
}

/// Shared, read-only map of provider id -> client
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    /// Registry with every built-in provider client
    pub fn builtin() -> Self {
        let mut registry = Self { providers: HashMap::new() };
        registry.register("openai", Arc::new(OpenAiClient::new()));
        registry.register("openai-image", Arc::new(OpenAiImageClient::new()));
        registry.register("anthropic", Arc::new(AnthropicClient::new()));
        registry.register("stub", Arc::new(StubProvider));
        registry
    }

    /// Add or replace a provider client
    pub fn register(&mut self, id: &str, provider: Arc<dyn AiProvider>) {
        self.providers.insert(id.to_string(), provider);
    }

    /// Builder-style registration, handy in tests
    pub fn with_provider(mut self, id: &str, provider: Arc<dyn AiProvider>) -> Self {
        self.register(id, provider);
        self
    }

    /// Resolve a provider id to its shared client
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn AiProvider>> {
        self.providers.get(id).cloned()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry").field("providers", &ids).finish()
    }
}

/// Read-only API-key store, populated once at startup
#[derive(Debug, Default)]
pub struct CredentialStore {
    keys: HashMap<String, String>,
}

impl CredentialStore {
    /// Load keys from the conventional environment variables
    ///
    /// OPENAI_API_KEY serves both the text and image clients.
    pub fn from_env() -> Self {
        let mut store = Self::default();
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            store.keys.insert("openai".to_string(), key.clone());
            store.keys.insert("openai-image".to_string(), key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            store.keys.insert("anthropic".to_string(), key);
        }
        store
    }

    /// Builder-style key injection
    pub fn with_key(mut self, provider: &str, key: &str) -> Self {
        self.keys.insert(provider.to_string(), key.to_string());
        self
    }

    /// API key configured for a provider, if any
    pub fn key_for(&self, provider: &str) -> Option<&str> {
        self.keys.get(provider).map(String::as_str)
    }
}

/// Map a reqwest transport failure onto the engine's provider error
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> ExecutorError {
    ExecutorError::Provider {
        provider: provider.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// Map a non-success HTTP response onto the engine's provider error
pub(crate) async fn response_error(provider: &str, response: reqwest::Response) -> ExecutorError {
    let status = response.status().as_u16();
    let mut message =
        response.text().await.unwrap_or_else(|_| "unreadable response body".to_string());
    if message.len() > 512 {
        let mut end = 512;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    ExecutorError::Provider {
        provider: provider.to_string(),
        status: Some(status),
        message,
    }
}
