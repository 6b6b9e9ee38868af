use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::prompt::build_prompt;
use crate::llm::{ChatCompletionRequest, LlmClient, UsageMetrics};
use crate::profile::ProfileSnapshot;
use crate::util::time::file_stamp;

pub const ERROR_PREFIX: &str = "Error generating persona: ";

#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub sample_limit: usize,
}

/// Model output, or the failure rendered as the document itself.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    #[serde(skip)]
    pub text: String,
    pub ok: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetrics>,
}

pub struct PersonaGenerator<'a> {
    client: &'a dyn LlmClient,
    opts: GenerationOptions,
}

impl<'a> PersonaGenerator<'a> {
    pub fn new(client: &'a dyn LlmClient, opts: GenerationOptions) -> Self {
        Self { client, opts }
    }

    pub fn prompt(&self, snapshot: &ProfileSnapshot) -> String {
        build_prompt(snapshot, self.opts.sample_limit)
    }

    /// Never fails: any client error becomes an `Error generating persona: ...` document.
    pub async fn generate(&self, prompt: String) -> Persona {
        let model = self
            .opts
            .model
            .clone()
            .unwrap_or_else(|| self.client.default_model().to_string());
        let mut request = ChatCompletionRequest::user(prompt);
        request.model = Some(model.clone());
        request.max_tokens = self.opts.max_tokens;
        request.temperature = self.opts.temperature;

        match self.client.chat_completion(request).await {
            Ok(resp) => Persona { text: resp.content, ok: true, model, usage: resp.usage },
            Err(err) => {
                warn!(error = %err, "persona generation failed");
                Persona { text: format!("{ERROR_PREFIX}{err}"), ok: false, model, usage: None }
            }
        }
    }
}

pub fn default_path(at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("reddit_persona_{}.md", file_stamp(at)))
}

pub fn save(text: &str, path: &Path) -> Result<()> {
    fs::write(path, text).with_context(|| format!("write persona to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockClient};
    use chrono::TimeZone;

    fn snapshot() -> ProfileSnapshot {
        let mut c = crate::profile::ScrapedItem::new(0);
        c.body = Some("I rewrote the parser in Rust this weekend.".into());
        ProfileSnapshot::assemble("alice", "https://www.reddit.com/user/alice/", Utc::now(), vec![], vec![c])
    }

    fn opts() -> GenerationOptions {
        GenerationOptions { sample_limit: 20, ..GenerationOptions::default() }
    }

    #[tokio::test]
    async fn returns_model_text_and_sends_one_user_turn() {
        let mock = MockClient::new();
        mock.push_text("# Alex the Builder");
        let generator = PersonaGenerator::new(&mock, GenerationOptions { max_tokens: Some(2048), ..opts() });

        let prompt = generator.prompt(&snapshot());
        let persona = generator.generate(prompt.clone()).await;

        assert!(persona.ok);
        assert_eq!(persona.text, "# Alex the Builder");
        assert_eq!(persona.model, "mock");
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages.len(), 1);
        assert_eq!(calls[0].messages[0].content, prompt);
        assert_eq!(calls[0].max_tokens, Some(2048));
        assert!(prompt.contains("COMMENT: I rewrote the parser in Rust this weekend."));
    }

    #[tokio::test]
    async fn failure_becomes_error_document() {
        let mock = MockClient::new();
        mock.push_response(Err(LlmError::MissingApiKey("GEMINI_API_KEY")));
        let generator = PersonaGenerator::new(&mock, GenerationOptions { model: Some("gemini-x".into()), ..opts() });

        let persona = generator.generate("prompt".into()).await;
        assert!(!persona.ok);
        assert_eq!(persona.text, "Error generating persona: GEMINI_API_KEY is not set");
        assert_eq!(persona.model, "gemini-x");
    }

    #[tokio::test]
    async fn error_document_never_contains_api_key() {
        use crate::llm::gemini::{GeminiClient, GeminiClientConfig};

        let client = GeminiClient::new(GeminiClientConfig {
            api_key: Some("SECRET-KEY-123".into()),
            base_url: "http://127.0.0.1:9/v1beta".into(),
            timeout: std::time::Duration::from_secs(5),
            ..GeminiClientConfig::default()
        })
        .unwrap();
        let generator = PersonaGenerator::new(&client, opts());

        let persona = generator.generate("prompt".into()).await;
        assert!(!persona.ok);
        assert!(persona.text.starts_with(ERROR_PREFIX));
        assert!(!persona.text.contains("SECRET-KEY-123"));
    }

    #[test]
    fn default_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2025, 7, 15, 23, 15, 9).unwrap();
        assert_eq!(default_path(at), PathBuf::from("reddit_persona_20250715_231509.md"));
    }

    #[test]
    fn save_writes_text_verbatim() {
        let path = std::env::temp_dir().join(format!("persona-{}.md", uuid::Uuid::new_v4()));
        save("# Persona\n\nbody", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Persona\n\nbody");
        let _ = fs::remove_file(&path);
    }
}
