//! OpenAI-compatible chat completions backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use hermes_config::LlmSettings;
use hermes_core::{CompletionGenerator, CompletionRequest};

use crate::LlmError;

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API endpoint (OpenAI: https://api.openai.com/v1, or a local server)
    pub endpoint: String,
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Organization ID (OpenAI specific)
    pub organization: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: hermes_config::constants::endpoints::OPENAI_DEFAULT.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(hermes_config::constants::llm::DEFAULT_TIMEOUT_SECS),
            organization: None,
        }
    }
}

impl OpenAIConfig {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            timeout: Duration::from_secs(settings.timeout_secs),
            organization: None,
        }
    }

    /// Config for a local OpenAI-compatible server (vLLM, Ollama, etc.)
    pub fn local(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: "not-needed".to_string(),
            ..Default::default()
        }
    }

    fn is_local(&self) -> bool {
        self.endpoint.starts_with("http://localhost") || self.endpoint.starts_with("http://127.0.0.1")
    }
}

/// OpenAI-compatible backend
///
/// Sends one system message and one user message per request and returns the
/// text of the first choice.
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !config.is_local() {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        if let Ok(val) = HeaderValue::from_str(&auth_value) {
            headers.insert(reqwest::header::AUTHORIZATION, val);
        }

        if let Some(ref org) = self.config.organization {
            if let Ok(val) = HeaderValue::from_str(org) {
                headers.insert("OpenAI-Organization", val);
            }
        }

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        headers
    }

    /// Send a chat completion request and return the first choice's text
    pub async fn chat(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let start = Instant::now();
        let body = OpenAIChatRequest::from(request);

        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = first_choice_text(response)?;

        tracing::debug!(
            model = %request.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Completion received"
        );

        Ok(text)
    }
}

fn first_choice_text(response: OpenAIChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
}

#[async_trait]
impl CompletionGenerator for OpenAIBackend {
    async fn complete(&self, request: CompletionRequest) -> hermes_core::Result<String> {
        self.chat(&request).await.map_err(Into::into)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

impl From<&CompletionRequest> for OpenAIChatRequest {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: Some(request.system_prompt.clone()),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: Some(request.user_message.clone()),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_endpoint_requires_key() {
        let result = OpenAIBackend::new(OpenAIConfig::default());
        assert!(matches!(result, Err(LlmError::Configuration(_))));

        let local = OpenAIBackend::new(OpenAIConfig {
            api_key: String::new(),
            ..OpenAIConfig::local("http://localhost:11434/v1")
        });
        assert!(local.is_ok());
    }

    #[test]
    fn test_chat_url_trims_slash() {
        let backend = OpenAIBackend::new(OpenAIConfig::local("http://localhost:8000/v1/")).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_headers() {
        let backend = OpenAIBackend::new(OpenAIConfig {
            api_key: "sk-test".to_string(),
            organization: Some("org-1".to_string()),
            ..Default::default()
        })
        .unwrap();
        let headers = backend.build_headers();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
        assert_eq!(headers.get("openai-organization").unwrap(), "org-1");
    }

    #[test]
    fn test_request_body() {
        let request = CompletionRequest::new("gpt-4o-mini", "Sos Hermi", "hola")
            .with_temperature(0.1)
            .with_max_tokens(200);
        let body = serde_json::to_value(OpenAIChatRequest::from(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Sos Hermi");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hola");
    }

    #[test]
    fn test_first_choice_text() {
        let response: OpenAIChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"¡Hola!"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "¡Hola!");

        let empty: OpenAIChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_choice_text(empty),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_error_converts_to_core() {
        let err: hermes_core::Error = LlmError::Timeout.into();
        assert!(err.is_collaborator());
    }
}
