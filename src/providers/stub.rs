/// Deterministic stub provider
///
/// Echoes the rendered prompt back as the response. Needs no API key, so
/// workflows can be dry-run before real credentials exist, and tests get a
/// provider whose output is a pure function of its input.

use crate::providers::{AiProvider, CompletionRequest, CompletionResponse};
use crate::runtime::error::ExecutorError;
use async_trait::async_trait;

pub struct StubProvider;

#[async_trait]
impl AiProvider for StubProvider {
    fn requires_api_key(&self) -> bool {
        false
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        _api_key: Option<&str>,
    ) -> Result<CompletionResponse, ExecutorError> {
        Ok(CompletionResponse { text: request.prompt.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn echoes_the_prompt() {
        let request = CompletionRequest {
            model: "stub-model".to_string(),
            prompt: "hello".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
            options: BTreeMap::new(),
        };
        let response = StubProvider.send(&request, None).await.unwrap();
        assert_eq!(response.text, "hello");
    }
}
