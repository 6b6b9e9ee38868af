use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod gemini;
pub mod openai;

#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;

/// Which text-generation backend to call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// `PERSONA_LLM_PROVIDER`, defaulting to Gemini.
    pub fn from_env() -> Self {
        match std::env::var("PERSONA_LLM_PROVIDER").ok().as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("openai") => Provider::OpenAi,
            _ => Provider::Gemini,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError>;

    fn default_model(&self) -> &str;
}

/// Build the configured client for `provider` from the environment.
pub fn client_for(provider: Provider) -> Result<Box<dyn LlmClient>, LlmError> {
    Ok(match provider {
        Provider::Gemini => Box::new(gemini::GeminiClient::new(gemini::GeminiClientConfig::from_env())?),
        Provider::OpenAi => Box::new(openai::OpenAiClient::new(openai::OpenAiClientConfig::from_env())?),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl ChatCompletionRequest {
    /// A single user turn with provider defaults for everything else.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::User, prompt)],
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("chat completion requires at least one message")]
    EmptyMessages,
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("api error {status}: {}", .error.message)]
    Api {
        status: StatusCode,
        error: ApiErrorBody,
    },
    #[error("response contained no text")]
    EmptyResponse,
    #[cfg(test)]
    #[error("mock client response queue is empty")]
    MockQueueEmpty,
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

impl LlmError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(err.without_url())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self {
            message: "unknown error".to_string(),
            r#type: None,
            code: None,
            status: None,
        }
    }
}

/// `{"error": {...}}`, shared by both providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

pub(crate) fn api_error(status: StatusCode, bytes: &[u8]) -> LlmError {
    let body = serde_json::from_slice::<ApiErrorEnvelope>(bytes)
        .ok()
        .map(|env| env.error);
    LlmError::Api {
        status,
        error: body.unwrap_or_default(),
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, LlmError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

#[cfg(test)]
impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<ChatCompletionResponse, LlmError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn push_text(&self, text: &str) {
        self.push_response(Ok(ChatCompletionResponse {
            content: text.to_string(),
            usage: None,
        }));
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::MockQueueEmpty))
    }

    fn default_model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            br#"{"error": {"message": "bad request", "type": "invalid_request_error"}}"#,
        );
        assert_eq!(format!("{err}"), "api error 400 Bad Request: bad request");
    }

    #[test]
    fn api_error_tolerates_unparseable_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert_eq!(format!("{err}"), "api error 502 Bad Gateway: unknown error");
    }

    #[test]
    fn missing_key_names_the_variable() {
        assert_eq!(LlmError::MissingApiKey("GEMINI_API_KEY").to_string(), "GEMINI_API_KEY is not set");
    }

    #[tokio::test]
    async fn mock_client_returns_enqueued_response() {
        let mock = MockClient::new();
        mock.push_text("hi");

        let req = ChatCompletionRequest::user("Hello");
        let out = mock.chat_completion(req.clone()).await.unwrap();

        assert_eq!(out.content, "hi");
        assert_eq!(mock.calls(), vec![req]);
        assert!(matches!(
            mock.chat_completion(ChatCompletionRequest::user("again")).await,
            Err(LlmError::MockQueueEmpty)
        ));
    }
}
