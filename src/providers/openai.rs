/// OpenAI provider clients
///
/// Two clients share the OpenAI credential: chat completions for text models
/// and image generation for DALL-E. Both are thin request/response mappers;
/// timeouts and retries are the engine's concern.

use crate::providers::{
    response_error, transport_error, AiProvider, CompletionRequest, CompletionResponse,
};
use crate::runtime::error::ExecutorError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

const PROVIDER_ID: &str = "openai";
const IMAGE_PROVIDER_ID: &str = "openai-image";

/// Chat-completion client for OpenAI text models
pub struct OpenAiClient {
    http: Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn send(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<CompletionResponse, ExecutorError> {
        let api_key = api_key.ok_or_else(|| ExecutorError::MissingCredentials {
            provider: PROVIDER_ID.to_string(),
        })?;

        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage { role: "user", content: request.prompt.clone() }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(response_error(PROVIDER_ID, response).await);
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| transport_error(PROVIDER_ID, e))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(CompletionResponse { text })
    }
}

/// Image-generation client for DALL-E models
///
/// The response text is the generated image URL.
pub struct OpenAiImageClient {
    http: Client,
}

impl OpenAiImageClient {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

impl Default for OpenAiImageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[async_trait]
impl AiProvider for OpenAiImageClient {
    async fn send(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<CompletionResponse, ExecutorError> {
        let api_key = api_key.ok_or_else(|| ExecutorError::MissingCredentials {
            provider: IMAGE_PROVIDER_ID.to_string(),
        })?;

        let body = ImageRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            n: 1,
            size: request
                .options
                .get("size")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        let response = self
            .http
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(IMAGE_PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(response_error(IMAGE_PROVIDER_ID, response).await);
        }

        let parsed: ImageResponse =
            response.json().await.map_err(|e| transport_error(IMAGE_PROVIDER_ID, e))?;
        let url = parsed.data.into_iter().next().and_then(|datum| datum.url).ok_or_else(|| {
            ExecutorError::Provider {
                provider: IMAGE_PROVIDER_ID.to_string(),
                status: None,
                message: "response carried no image url".to_string(),
            }
        })?;

        Ok(CompletionResponse { text: url })
    }
}
