use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use super::{
    api_error, ChatCompletionRequest, ChatCompletionResponse, ChatRole, LlmClient, LlmError,
    UsageMetrics,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone, Debug)]
pub struct GeminiClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_top_p: f32,
    pub timeout: Duration,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            default_top_p: DEFAULT_TOP_P,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeminiClientConfig {
    /// `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`, `GEMINI_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                cfg.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            cfg.default_model = model;
        }
        if let Ok(base) = std::env::var("GEMINI_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(timeout) = std::env::var("GEMINI_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

/// Google Generative Language `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: HttpClient,
    cfg: GeminiClientConfig,
}

impl GeminiClient {
    pub fn new(cfg: GeminiClientConfig) -> Result<Self, LlmError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(LlmError::from_reqwest)?;
        Ok(Self { http, cfg })
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.cfg
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey("GEMINI_API_KEY"))
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_body(&self, req: &ChatCompletionRequest) -> Value {
        let system = req
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<Value> = req
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = if m.role == ChatRole::Assistant { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut generation = json!({
            "temperature": req.temperature.unwrap_or(self.cfg.default_temperature),
            "topP": req.top_p.unwrap_or(self.cfg.default_top_p),
        });
        if let Some(max) = req.max_tokens {
            generation["maxOutputTokens"] = json!(max);
        }

        let mut body = json!({ "contents": contents, "generationConfig": generation });
        if !system.is_empty() {
            body["system_instruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::EmptyMessages);
        }

        let key = self.api_key()?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.cfg.default_model.clone());
        let body = self.build_body(&request);

        let response = self
            .http
            .post(self.endpoint(&model))
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !status.is_success() {
            return Err(api_error(status, &bytes));
        }

        let data: Value = serde_json::from_slice(&bytes).map_err(LlmError::Decode)?;
        parse_response(data)
    }

    fn default_model(&self) -> &str {
        &self.cfg.default_model
    }
}

fn parse_response(data: Value) -> Result<ChatCompletionResponse, LlmError> {
    let mut text = String::new();
    if let Some(parts) = data["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
        }
    }
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let usage = data.get("usageMetadata").map(|u| UsageMetrics {
        prompt_tokens: token_count(&u["promptTokenCount"]),
        completion_tokens: token_count(&u["candidatesTokenCount"]),
        total_tokens: token_count(&u["totalTokenCount"]),
    });

    Ok(ChatCompletionResponse {
        content: text,
        usage,
    })
}

fn token_count(v: &Value) -> Option<u32> {
    v.as_u64().and_then(|n| u32::try_from(n).ok())
}
