use std::path::PathBuf;
use std::sync::Arc;

use aspace_searcher::config::DEFAULT_ENVIRONMENT;
use aspace_searcher::{Config, SearchTerm, Searcher, http};
use clap::Parser;
use tracing::{error, info};

/// Run one ArchivesSpace search the way the federated-search host would.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Search term
    query: String,

    /// Config file (default: config/searchers/archives_space_config.yml, then config/archives_space_config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Config section to use
    #[arg(short, long, env = "ASPACE_SEARCHER_ENV", default_value = DEFAULT_ENVIRONMENT)]
    env: String,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aspace_searcher=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::discover(cli.config.as_deref(), &cli.env)
        .inspect_err(|e| error!("failed to load config: {e}"))?;
    let http = http::build_client(&config.http)?;

    let mut searcher = Searcher::new(http, Arc::new(config), SearchTerm::new(&cli.query));
    info!(term = %searcher.term().not_escaped(), "starting search");
    searcher
        .search()
        .await
        .inspect_err(|e| error!("search failed: {e}"))?;

    let total = searcher.total()?;
    let results = searcher.results()?;
    let more = searcher.loaded_link()?;

    if cli.json {
        let output = serde_json::json!({
            "query": cli.query,
            "total": total.to_string(),
            "results": results,
            "loaded_link": more,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{total} results for \"{}\"\n", cli.query);
        for (i, result) in results.iter().enumerate() {
            println!("{}. {}", i + 1, result.title);
            println!("   {}", result.link);
            if !result.description.is_empty() {
                println!("   {}", result.description);
            }
        }
        println!("\nView all: {more}");
    }

    Ok(())
}
