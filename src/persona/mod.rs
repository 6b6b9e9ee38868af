pub mod generator;
pub mod prompt;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::llm::{self, Provider};
use crate::profile::{snapshot, ProfileSnapshot};
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::persona::{Persona as PersonaOp, Phase};

use self::generator::{GenerationOptions, Persona, PersonaGenerator};
use self::prompt::DEFAULT_SAMPLE_LIMIT;

#[derive(Args, Clone, Debug)]
pub struct LlmArgs {
    /// Defaults to PERSONA_LLM_PROVIDER, else gemini
    #[arg(long, value_enum)] pub provider: Option<Provider>,
    /// Overrides the provider's configured model
    #[arg(long)] pub model: Option<String>,
    /// Content lines included in the prompt
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LIMIT)] pub sample_limit: usize,
    #[arg(long)] pub max_tokens: Option<u32>,
    #[arg(long)] pub temperature: Option<f32>,
}

impl LlmArgs {
    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_else(Provider::from_env)
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            sample_limit: self.sample_limit,
        }
    }
}

#[derive(Args)]
pub struct PersonaCmd {
    /// Snapshot written by `scrape`
    snapshot: PathBuf,
    /// Persona file (default `reddit_persona_<YYYYMMDD_HHMMSS>.md`)
    #[arg(long, short)] output: Option<PathBuf>,
    /// Print the prompt instead of calling the model
    #[arg(long, default_value_t = false)] dry_run: bool,
    #[command(flatten)] llm: LlmArgs,
}

#[derive(Serialize)]
pub struct PersonaPlan {
    pub username: String,
    pub provider: Provider,
    pub sample_limit: usize,
    pub prompt: String,
}

#[derive(Serialize)]
pub struct PersonaResult {
    pub username: String,
    pub provider: Provider,
    pub output: PathBuf,
    pub prompt_chars: usize,
    #[serde(flatten)]
    pub persona: Persona,
}

pub async fn run(args: PersonaCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::persona();
    let _g = log.root_span_kv([
        ("snapshot", args.snapshot.display().to_string()),
        ("provider", args.llm.provider().as_str().to_string()),
        ("sample_limit", args.llm.sample_limit.to_string()),
        ("dry_run", args.dry_run.to_string()),
    ]).entered();

    let _s = log.span(&Phase::Load).entered();
    let snap = snapshot::load(&args.snapshot)?;
    log.info(format!("📂 Loaded u/{} — posts={} comments={}", snap.username, snap.posts.len(), snap.comments.len()));
    drop(_s);

    if args.dry_run {
        let prompt = prompt::build_prompt(&snap, args.llm.sample_limit);
        if telemetry::config::json_mode() {
            let plan = PersonaPlan {
                username: snap.username.clone(),
                provider: args.llm.provider(),
                sample_limit: args.llm.sample_limit,
                prompt,
            };
            log.plan(&plan)?;
        } else {
            println!("{}", prompt);
            log.info("   Drop --dry-run to call the model.");
        }
        return Ok(());
    }

    let res = generate_persona(&snap, &args.llm, args.output.as_deref(), &log).await?;
    if telemetry::config::json_mode() {
        log.result_timed(&res, started)?;
    }
    Ok(())
}

/// Build the prompt, call the provider, write whatever came back.
pub async fn generate_persona(
    snap: &ProfileSnapshot,
    llm_args: &LlmArgs,
    output: Option<&Path>,
    log: &LogCtx<PersonaOp>,
) -> Result<PersonaResult> {
    let provider = llm_args.provider();
    let client = llm::client_for(provider).context("build LLM client")?;
    let generator = PersonaGenerator::new(client.as_ref(), llm_args.options());

    let _s = log.span(&Phase::Prompt).entered();
    let prompt = generator.prompt(snap);
    log.debug_kv("prompt built", [("chars", prompt.len().to_string())]);
    drop(_s);
    let prompt_chars = prompt.chars().count();

    let _s = log.span_kv(&Phase::CallLlm, [("provider", provider.as_str().to_string())]).entered();
    log.info("🧠 Generating persona...");
    let persona = generator.generate(prompt).await;
    if !persona.ok {
        log.warn(persona.text.as_str());
    }
    drop(_s);

    let _s = log.span(&Phase::Write).entered();
    let path = output.map(Path::to_path_buf).unwrap_or_else(|| generator::default_path(Utc::now()));
    generator::save(&persona.text, &path)?;
    log.info_kv(&format!("💾 Persona saved to {}", path.display()), [
        ("path", path.display().to_string()),
        ("ok", persona.ok.to_string()),
        ("chars", persona.text.chars().count().to_string()),
    ]);
    drop(_s);

    Ok(PersonaResult {
        username: snap.username.clone(),
        provider,
        output: path,
        prompt_chars,
        persona,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        llm: LlmArgs,
    }

    #[test]
    fn llm_flags_parse() {
        let h = Harness::parse_from(["x", "--provider", "openai", "--model", "gpt-4o", "--sample-limit", "5"]);
        assert_eq!(h.llm.provider(), Provider::OpenAi);
        let opts = h.llm.options();
        assert_eq!(opts.model.as_deref(), Some("gpt-4o"));
        assert_eq!(opts.sample_limit, 5);
    }

    #[test]
    fn sample_limit_defaults_to_twenty() {
        let h = Harness::parse_from(["x", "--provider", "gemini"]);
        assert_eq!(h.llm.sample_limit, 20);
        assert_eq!(h.llm.provider(), Provider::Gemini);
        assert!(h.llm.max_tokens.is_none());
    }
}
