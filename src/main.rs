use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod browser;
mod config;
mod extract;
mod llm;
mod output;
mod persona;
mod probe;
mod profile;
mod run;
mod scrape;
mod telemetry;
mod util;

#[derive(Parser)]
#[command(name = "persona", about = "Reddit profile scraper and persona generator")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a profile's posts and comments into a snapshot file
    Scrape(scrape::ScrapeCmd),
    /// Generate a persona document from a snapshot file
    Persona(persona::PersonaCmd),
    /// Scrape, then generate a persona from the fresh snapshot
    Run(run::RunCmd),
    /// Report how a profile's comments page is structured
    Probe(probe::ProbeCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // stderr only; respects RUST_LOG and PERSONA_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Scrape(args) => scrape::run(args).await?,
        Commands::Persona(args) => persona::run(args).await?,
        Commands::Run(args) => run::run(args).await?,
        Commands::Probe(args) => probe::run(args).await?,
    }

    Ok(())
}
