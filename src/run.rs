use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::persona::{self, LlmArgs, PersonaResult};
use crate::scrape::{self, BrowserArgs, ScrapeResult};
use crate::telemetry::{self};
use crate::telemetry::ops::run::Phase;

/// Scrape a profile and turn the fresh snapshot straight into a persona.
#[derive(Args)]
pub struct RunCmd {
    profile_url: String,
    /// Snapshot file (default `<username>_scraped_data.json`)
    #[arg(long)] snapshot_output: Option<PathBuf>,
    /// Persona file (default `reddit_persona_<YYYYMMDD_HHMMSS>.md`)
    #[arg(long, short)] output: Option<PathBuf>,
    #[command(flatten)] browser: BrowserArgs,
    #[command(flatten)] llm: LlmArgs,
}

#[derive(Serialize)]
struct RunResult {
    scrape: ScrapeResult,
    persona: PersonaResult,
}

pub async fn run(args: RunCmd) -> Result<()> {
    let started = Instant::now();
    let settings = args.browser.settings();
    let log = telemetry::run();
    let _g = log.root_span_kv([
        ("profile_url", args.profile_url.clone()),
        ("provider", args.llm.provider().as_str().to_string()),
        ("headless", settings.headless.to_string()),
        ("max_items", settings.max_items.to_string()),
    ]).entered();

    let _s = log.span(&Phase::Scrape).entered();
    let scraped = scrape::scrape_profile(
        &settings,
        &args.profile_url,
        args.snapshot_output.as_deref(),
        &telemetry::scrape(),
    )
    .await?;
    drop(_s);

    let _s = log.span(&Phase::Persona).entered();
    let persona = persona::generate_persona(
        &scraped.snapshot,
        &args.llm,
        args.output.as_deref(),
        &telemetry::persona(),
    )
    .await?;
    drop(_s);

    if telemetry::config::json_mode() {
        let res = RunResult { scrape: scraped.result(), persona };
        log.result_timed(&res, started)?;
    } else {
        log.info(format!(
            "✅ Done — u/{} posts={} comments={} persona={}",
            scraped.snapshot.username,
            scraped.snapshot.total_posts,
            scraped.snapshot.total_comments,
            persona.output.display()
        ));
    }
    Ok(())
}
