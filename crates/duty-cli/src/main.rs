//! Duty CLI
//!
//! Import duty and VAT calculations from the command line. Results are
//! printed to stdout as JSON; logs go to stderr.
//!
//! ```sh
//! duty-cli calculate product.json DE
//! duty-cli batch products.json US --summary
//! duty-cli classify "Wireless headphones"
//! RUST_LOG_FORMAT=json duty-cli stats
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rate_sources::SourceConfig;
use tax_engine::{EngineConfig, TaxEngine};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "duty-cli",
    version,
    about = "Import duty and VAT calculator for cross-border orders"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate duty and VAT for one product (JSON object file).
    Calculate {
        product: PathBuf,
        /// Destination country code (DE, US, UK, ...).
        country: String,
        /// Print the simplified calculation instead of the full result.
        #[arg(long)]
        summary: bool,
    },
    /// Calculate every product in a JSON array file, in order.
    Batch {
        products: PathBuf,
        country: String,
        #[arg(long)]
        summary: bool,
    },
    /// Cache size, cached countries and rate source health.
    Stats,
    /// Re-sync every rate source and drop cached rates.
    Refresh,
    /// Suggest an HS code for a product title.
    Classify {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = EngineConfig::from_env().context("failed to load engine configuration")?;
    let sources = SourceConfig::from_env();
    tracing::debug!(
        "Base currency {}, cache {} (ttl {}s), source timeout {:?}",
        config.base_currency,
        config.cache.enabled,
        config.cache.ttl_seconds,
        sources.timeout
    );

    let engine = TaxEngine::with_default_sources(config, &sources)
        .context("failed to initialize tax engine")?;

    let output = match cli.command {
        Command::Calculate { product, country, summary } => {
            commands::calculate(&engine, &product, &country, summary).await?
        }
        Command::Batch { products, country, summary } => {
            commands::batch(&engine, &products, &country, summary).await?
        }
        Command::Stats => commands::stats(&engine).await?,
        Command::Refresh => commands::refresh(&engine).await?,
        Command::Classify { title } => commands::classify(&engine, &title.join(" "))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
