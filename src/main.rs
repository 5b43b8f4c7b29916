mod cli;
mod config;
mod download;
mod retry;
mod sync;
mod zeplin;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use zeplin::ZeplinClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(Cli::parse());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("{:?}", config);

    let client = ZeplinClient::new(config.access_token.clone());
    let fetcher = client.download_client();

    let outcome = sync::run(&client, &fetcher, &config.sync_options()).await?;

    write_outputs(&outcome).await?;

    tracing::info!(
        "Done: {} downloaded, {} failed, {} log entries -> {}",
        outcome.downloaded,
        outcome.failed,
        outcome.log.total_entries(),
        outcome.directory.display()
    );

    Ok(())
}

/// Write metadata.json and log.json at the output root. Both are written
/// even when empty so consumers can rely on their presence.
async fn write_outputs(outcome: &sync::SyncOutcome) -> anyhow::Result<()> {
    let metadata =
        serde_json::to_vec_pretty(&outcome.tree).context("serializing metadata tree")?;
    let metadata_path = outcome.directory.join("metadata.json");
    tokio::fs::write(&metadata_path, metadata)
        .await
        .with_context(|| format!("writing {}", metadata_path.display()))?;

    let log = serde_json::to_vec_pretty(&outcome.log.to_json()).context("serializing log")?;
    let log_path = outcome.directory.join("log.json");
    tokio::fs::write(&log_path, log)
        .await
        .with_context(|| format!("writing {}", log_path.display()))?;

    Ok(())
}
