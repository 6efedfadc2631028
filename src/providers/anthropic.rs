/// Anthropic messages-API client

use crate::providers::{
    response_error, transport_error, AiProvider, CompletionRequest, CompletionResponse,
};
use crate::runtime::error::ExecutorError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROVIDER_ID: &str = "anthropic";

/// The messages API requires max_tokens; used when the module configures none
const DEFAULT_MAX_TOKENS: u64 = 1024;

pub struct AnthropicClient {
    http: Client,
}

impl AnthropicClient {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u64,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[async_trait]
impl AiProvider for AnthropicClient {
    async fn send(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<CompletionResponse, ExecutorError> {
        let api_key = api_key.ok_or_else(|| ExecutorError::MissingCredentials {
            provider: PROVIDER_ID.to_string(),
        })?;

        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![ApiMessage { role: "user", content: request.prompt.clone() }],
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(response_error(PROVIDER_ID, response).await);
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| transport_error(PROVIDER_ID, e))?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .unwrap_or_default();

        Ok(CompletionResponse { text })
    }
}
