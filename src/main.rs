use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod format;
mod handlers;
mod models;
mod services;

use config::AppConfig;
use handlers::{fetch_handlers, visualize_handlers};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::debug!("Starting envidat-inventory with config: {:?}", cfg);

    // --- Dispatch ---
    match &cfg {
        AppConfig::Fetch(fetch) => {
            fetch_handlers::fetch(fetch).await?;
        }
        AppConfig::Visualize(vis) => {
            visualize_handlers::visualize(vis)?;
        }
        AppConfig::RunAll(fetch, vis) => {
            let summary = fetch_handlers::fetch(fetch).await?;
            tracing::info!(
                "Fetched {} records from {} buckets; aggregating {}",
                summary.total_records(),
                summary.buckets.len(),
                vis.csv.display()
            );
            visualize_handlers::visualize(vis)?;
        }
    }

    Ok(())
}
