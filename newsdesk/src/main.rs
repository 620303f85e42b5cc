//! Newsdesk CLI.
//!
//! The entry point for the `newsdesk` binary. The run report is printed to
//! stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use newsdesk::cancellation::CancellationToken;
use newsdesk::config::AppConfig;
use newsdesk::core::RunReport;
use newsdesk::events::LoggingEventSink;
use newsdesk::generation::OllamaClient;
use newsdesk::observability::init_tracing;
use newsdesk::pipeline::PipelineOrchestrator;
use newsdesk::publishing::WordPressPublisher;
use newsdesk::sources::RssFeedSource;
use newsdesk::store::{JsonFileProcessedItemStore, ProcessedItemStore};

/// Turns news-feed items into published blog posts.
#[derive(Debug, Parser)]
#[command(name = "newsdesk", version, about)]
struct Cli {
    /// Read environment variables from this file instead of `./.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, summarize, draft and publish once.
    Run,
    /// Validate configuration and reach the generation runtime and store.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("newsdesk: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn execute(cli: Cli) -> Result<i32> {
    load_env(cli.env_file.as_deref())?;
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format, config.log_file.as_deref())
        .context("failed to initialize logging")?;

    match cli.command {
        Commands::Run => run(&config).await,
        Commands::Check => check(&config).await,
    }
}

fn load_env(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to read env file {}", path.display()))?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("failed to read .env"),
        },
    }
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<JsonFileProcessedItemStore> {
    JsonFileProcessedItemStore::open(config.store_path.clone())
        .await
        .with_context(|| format!("failed to open store {}", config.store_path.display()))
}

async fn run(config: &AppConfig) -> Result<i32> {
    let ollama = Arc::new(OllamaClient::new(&config.ollama)?);
    ollama.health_check().await?;

    let source = RssFeedSource::new(&config.feeds)?;
    let publisher = WordPressPublisher::new(&config.wordpress)?;
    let store = open_store(config).await?;

    let cancel = Arc::new(CancellationToken::new());
    let on_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current batch");
            on_signal.cancel("interrupted");
        }
    });

    let orchestrator = PipelineOrchestrator::builder()
        .source(source)
        .summarizer(Arc::clone(&ollama))
        .drafter(ollama)
        .publisher(publisher)
        .store(Arc::new(store))
        .event_sink(Arc::new(LoggingEventSink::debug()))
        .config(config.pipeline.clone())
        .cancellation(cancel)
        .build()?;

    let report = match orchestrator.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("newsdesk: {e}");
            return Ok(RunReport::EXIT_INITIALIZATION);
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize run report")?
    );
    Ok(report.exit_code())
}

async fn check(config: &AppConfig) -> Result<i32> {
    let ollama = OllamaClient::new(&config.ollama)?;
    let version = ollama.health_check().await?;
    RssFeedSource::new(&config.feeds)?;
    WordPressPublisher::new(&config.wordpress)?;
    let store = open_store(config).await?;
    let records = store.len().await?;

    info!(
        ollama_version = %version,
        model = ollama.model(),
        feeds = config.feeds.urls.len(),
        store = %config.store_path.display(),
        records,
        "Configuration is usable"
    );
    println!("ok: ollama {version}, {} feeds, {records} stored records", config.feeds.urls.len());
    Ok(RunReport::EXIT_OK)
}
