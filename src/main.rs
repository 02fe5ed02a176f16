use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use listing_harvest::{
    harvest, CancelFlag, FileSink, HarvestConfig, HarvestError, HttpLauncher, OutputFormat,
    ThreadPause,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "listing-harvest",
    about = "Harvest job listings from a paginated site into CSV, JSON or XML"
)]
struct Cli {
    /// Site and run configuration (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Directory the results are written to.
    #[arg(long, default_value = "output")]
    out: PathBuf,

    /// Base file name; the extension follows the format.
    #[arg(long, default_value = "jobs")]
    name: String,

    /// csv, json or xml.
    #[arg(long, default_value = "csv")]
    format: String,

    /// Override `run.max_pages` from the config file.
    #[arg(long)]
    max_pages: Option<u32>,

    /// User-Agent header for HTTP sessions.
    #[arg(long, env = "LISTING_HARVEST_USER_AGENT")]
    user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Reject a bad format before any page is fetched
    let format: OutputFormat = cli.format.parse()?;
    let mut config = HarvestConfig::from_json_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(max_pages) = cli.max_pages {
        config.run.max_pages = max_pages;
    }

    let mut launcher = HttpLauncher::default();
    if let Some(user_agent) = cli.user_agent {
        launcher.user_agent = user_agent;
    }

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    // First Ctrl-C stops the loop and saves; a second one quits at once
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_interrupt.raise() {
                tracing::error!("Interrupted again; exiting without saving");
                std::process::exit(130);
            }
            tracing::warn!(
                "Interrupted; finishing up and saving what was collected (Ctrl-C again to quit)"
            );
        }
    });

    let destination = cli.out.join(&cli.name);
    let result = tokio::task::spawn_blocking(move || {
        harvest(
            &mut launcher,
            &config.site,
            &config.run,
            cancel,
            &mut ThreadPause,
            &mut FileSink,
            &destination,
            format,
        )
    })
    .await
    .context("Harvest task panicked")?;

    match result {
        Ok(report) => {
            println!("Stop reason: {}", report.outcome.stop_reason);
            println!("Unique records: {}", report.outcome.records.len());
            match report.written {
                Some(path) => println!("Saved to {}", path.display()),
                None => println!("No data to save"),
            }
            Ok(())
        }
        Err(HarvestError::Persist { source, outcome }) => {
            tracing::error!(
                "{} records collected ({}) but not saved",
                outcome.records.len(),
                outcome.stop_reason
            );
            Err(source).context("Failed to save results")
        }
        Err(e) => Err(e.into()),
    }
}
