use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use carscout::filter::{self, FilterCriteria};
use carscout::web::{self, AppState};
use carscout::{telemetry, AppConfig, SearchService};

/// Vehicle listing search across Ethiopian classifieds sites.
#[derive(Parser, Debug)]
#[command(name = "carscout", version, about)]
struct Cli {
    /// Configuration file. Without it config/default, config/$RUN_MODE and
    /// config/local are tried.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Run one search and print the listings as JSON.
    Search {
        query: String,
        /// Source name, or `both`/`all`.
        #[arg(short, long)]
        platform: Option<String>,
        /// Case-sensitive substring of the title.
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        location: Option<String>,
    },
    /// List the configured sources.
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Search {
            query,
            platform,
            brand,
            min_price,
            max_price,
            location,
        } => {
            let criteria = FilterCriteria {
                brand,
                min_price,
                max_price,
                location,
            };
            search(config, &query, platform.as_deref(), &criteria).await
        }
        Command::Sources => {
            let service = SearchService::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&service.sources())?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("Starting carscout v{}", env!("CARGO_PKG_VERSION"));

    let metrics = telemetry::init_metrics(&config.metrics)?;
    let service = SearchService::from_config(&config)?;

    let mut state = AppState::new(service, config);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    web::serve(state).await
}

async fn search(
    config: AppConfig,
    query: &str,
    platform: Option<&str>,
    criteria: &FilterCriteria,
) -> Result<()> {
    let service = SearchService::from_config(&config)?;
    let report = service.search(Some(query), platform).await?;

    for source in report.sources.iter().filter(|s| s.is_failed()) {
        tracing::warn!(
            source = %source.source,
            error = source.error.as_deref().unwrap_or("unknown"),
            "Source failed"
        );
    }

    let listings = filter::apply(&report.listings, criteria);
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}
