pub mod loader;
pub mod profile;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::browser::ChromeSession;
use crate::config::ScrapeSettings;
use crate::profile::snapshot;
use crate::profile::url::{username_from_url, ProfilePages};
use crate::profile::ProfileSnapshot;
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::scrape::{Phase, Scrape};

use self::profile::{PageHarvest, ProfileScraper};

/// Browser and pacing overrides on top of `ScrapeSettings::from_env()`.
#[derive(Args, Clone, Debug, Default)]
pub struct BrowserArgs {
    /// Run Chrome without a window
    #[arg(long, default_value_t = false)] pub headless: bool,
    /// Attach to a running Chrome instead of launching one
    #[arg(long)] pub remote_debugging_url: Option<String>,
    /// Elements processed per page
    #[arg(long)] pub max_items: Option<usize>,
    #[arg(long)] pub post_scrolls: Option<usize>,
    #[arg(long)] pub comment_scrolls: Option<usize>,
    #[arg(long)] pub ready_timeout_secs: Option<u64>,
    /// Save a screenshot here when a page never becomes ready
    #[arg(long)] pub diagnostics_dir: Option<PathBuf>,
}

impl BrowserArgs {
    pub fn settings(&self) -> ScrapeSettings {
        self.apply(ScrapeSettings::from_env())
    }

    fn apply(&self, mut cfg: ScrapeSettings) -> ScrapeSettings {
        if self.headless { cfg.headless = true; }
        if let Some(url) = &self.remote_debugging_url { cfg.remote_debugging_url = Some(url.clone()); }
        if let Some(n) = self.max_items { cfg.max_items = n; }
        if let Some(n) = self.post_scrolls { cfg.post_scrolls = n; }
        if let Some(n) = self.comment_scrolls { cfg.comment_scrolls = n; }
        if let Some(secs) = self.ready_timeout_secs { cfg.ready_timeout = Duration::from_secs(secs); }
        if let Some(dir) = &self.diagnostics_dir { cfg.diagnostics_dir = Some(dir.clone()); }
        cfg
    }
}

#[derive(Args)]
pub struct ScrapeCmd {
    /// e.g. https://www.reddit.com/user/<name>/
    profile_url: String,
    /// Snapshot file (default `<username>_scraped_data.json`)
    #[arg(long, short)] output: Option<PathBuf>,
    /// Print the plan and exit without launching a browser
    #[arg(long, default_value_t = false)] dry_run: bool,
    #[command(flatten)] browser: BrowserArgs,
}

#[derive(Debug, Serialize)]
pub struct ScrapePlan {
    pub username: String,
    pub profile_url: String,
    pub submitted_url: String,
    pub comments_url: String,
    pub output: PathBuf,
    pub settings: ScrapeSettings,
}

#[derive(Serialize)]
pub struct ScrapeResult {
    pub username: String,
    pub output: PathBuf,
    pub total_posts: usize,
    pub total_comments: usize,
    pub pages: Vec<PageHarvest>,
}

pub struct ScrapeOutput {
    pub snapshot: ProfileSnapshot,
    pub path: PathBuf,
    pub pages: Vec<PageHarvest>,
}

impl ScrapeOutput {
    pub fn result(&self) -> ScrapeResult {
        ScrapeResult {
            username: self.snapshot.username.clone(),
            output: self.path.clone(),
            total_posts: self.snapshot.total_posts,
            total_comments: self.snapshot.total_comments,
            pages: self.pages.clone(),
        }
    }
}

pub async fn run(args: ScrapeCmd) -> Result<()> {
    let started = Instant::now();
    let settings = args.browser.settings();
    let log = telemetry::scrape();
    let _g = log.root_span_kv([
        ("profile_url", args.profile_url.clone()),
        ("output", format!("{:?}", args.output)),
        ("dry_run", args.dry_run.to_string()),
        ("headless", settings.headless.to_string()),
        ("max_items", settings.max_items.to_string()),
    ]).entered();

    if args.dry_run {
        let plan = plan(&settings, &args.profile_url, args.output.as_deref())?;
        log.info(format!("📝 Scrape plan — u/{} max_items={} post_scrolls={} comment_scrolls={}",
            plan.username, settings.max_items, settings.post_scrolls, settings.comment_scrolls));
        log.info(format!("  posts:    {}", plan.submitted_url));
        log.info(format!("  comments: {}", plan.comments_url));
        log.info(format!("  output:   {}", plan.output.display()));
        log.info("   Drop --dry-run to execute.");
        if telemetry::config::json_mode() {
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let out = scrape_profile(&settings, &args.profile_url, args.output.as_deref(), &log).await?;
    if telemetry::config::json_mode() {
        log.result_timed(&out.result(), started)?;
    }
    Ok(())
}

/// Resolve everything a scrape would touch without opening a browser.
pub fn plan(settings: &ScrapeSettings, profile_url: &str, output: Option<&Path>) -> Result<ScrapePlan> {
    let username = username_from_url(profile_url)?;
    let pages = ProfilePages::new(&settings.base_url, &username);
    Ok(ScrapePlan {
        output: output.map(Path::to_path_buf).unwrap_or_else(|| snapshot::default_path(&username)),
        username,
        profile_url: profile_url.to_string(),
        submitted_url: pages.submitted,
        comments_url: pages.comments,
        settings: settings.clone(),
    })
}

/// Launch a browser, scrape both pages, close the browser, write the snapshot.
pub async fn scrape_profile(
    settings: &ScrapeSettings,
    profile_url: &str,
    output: Option<&Path>,
    log: &LogCtx<Scrape>,
) -> Result<ScrapeOutput> {
    let _s = log.span_kv(&Phase::Resolve, [("profile_url", profile_url.to_string())]).entered();
    let username = username_from_url(profile_url)?;
    drop(_s);

    let _s = log.span_kv(&Phase::Launch, [("headless", settings.headless.to_string())]).entered();
    let session = ChromeSession::launch(&settings.launch_options())
        .await
        .context("launch Chrome")?;
    log.info("🌐 Browser ready");
    drop(_s);

    let scraped = ProfileScraper::new(&session, settings, log).scrape(profile_url).await;
    if let Err(err) = session.close().await {
        log.warn(format!("browser did not close cleanly: {}", err));
    }
    let (snapshot, report) = scraped.with_context(|| format!("scrape u/{}", username))?;

    let _s = log.span(&Phase::Write).entered();
    let path = output.map(Path::to_path_buf).unwrap_or_else(|| snapshot::default_path(&snapshot.username));
    snapshot::save(&snapshot, &path)?;
    log.info(format!("💾 Data saved to {}", path.display()));
    drop(_s);

    Ok(ScrapeOutput { snapshot, path, pages: report.pages })
}
