use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use taggr::dispatch::DispatchEngine;
use taggr::domain::{DispatchRequest, DispatchResult};
use taggr::labeler::{BatchOptions, run_batch};
use taggr::llm::{HttpTransport, extract_content};
use taggr::store::{AppState, ConfigDirectory, check_state};
use taggr::TaggrError;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taggr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("taggr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Cancel the returned token on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    cancel
}

fn read_payload(path: Option<&Path>) -> Result<serde_json::Value> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
    };
    serde_json::from_str(&raw).context("Payload is not valid JSON")
}

async fn run_application(cli: &Cli, state: &AppState) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Dispatch { group, payload, min_chars, max_chars, auto_retry } => {
            handle_dispatch_command(
                state,
                group,
                payload.as_deref(),
                *min_chars,
                *max_chars,
                *auto_retry,
            )
            .await
        }
        Commands::Label { group, dir, prompt, workers, min_chars, max_chars, auto_retry } => {
            let options = BatchOptions {
                schedule_group_id: group.clone(),
                prompt: prompt.clone(),
                workers: *workers,
                min_chars: *min_chars,
                max_chars: *max_chars,
                auto_retry: *auto_retry,
            };
            handle_label_command(state, dir, &options, cli.is_verbose()).await
        }
        Commands::Models { channel } => handle_models_command(state, channel).await,
        Commands::Check => handle_check_command(state),
    }
}

async fn handle_dispatch_command(
    state: &AppState,
    group: &str,
    payload_path: Option<&Path>,
    min_chars: Option<u32>,
    max_chars: Option<u32>,
    auto_retry: Option<bool>,
) -> Result<()> {
    info!("Dispatching through schedule group: {}", group);
    let payload = read_payload(payload_path)?;

    let mut request = DispatchRequest::new(group, payload);
    request.min_chars = min_chars;
    request.max_chars = max_chars;
    request.auto_retry = auto_retry;

    let engine = DispatchEngine::new(Arc::new(HttpTransport::new()));
    let cancel = cancel_on_ctrl_c();
    let result = engine.dispatch(state, &request, &cancel).await?;
    info!(
        "Dispatch finished: ok={} attempts={}",
        result.is_ok(),
        result.attempts().len()
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    match &result {
        DispatchResult::Success(success) => {
            println!(
                "{} channel {} (attempt {})",
                "Accepted:".green(),
                success.step.channel_id,
                success.attempt
            );
            println!("{}", extract_content(&success.response));
        }
        DispatchResult::Failed(failure) => {
            println!(
                "{} {} ({} attempts)",
                "Failed:".red(),
                failure.error,
                failure.attempts.len()
            );
        }
    }
    Ok(())
}

async fn handle_label_command(
    state: &AppState,
    dir: &Path,
    options: &BatchOptions,
    verbose: bool,
) -> Result<()> {
    info!("Labeling directory: {}", dir.display());
    println!("{} {}", "Labeling:".cyan(), dir.display());

    let engine = DispatchEngine::new(Arc::new(HttpTransport::new()));
    let cancel = cancel_on_ctrl_c();
    let report = run_batch(&engine, state, dir, options, &cancel)
        .await
        .context("Labeling batch failed")?;

    for record in &report.records {
        if record.ok {
            println!(
                "  {} {} ({} chars, {} ms)",
                "ok".green(),
                record.name,
                record.text_length.unwrap_or(0),
                record.duration_ms
            );
        } else {
            println!(
                "  {} {}: {}",
                "failed".red(),
                record.name,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if verbose {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    println!(
        "{} {}/{} labeled, {} failed",
        "Done:".green(),
        report.labeled,
        report.total,
        report.failed
    );
    Ok(())
}

async fn handle_models_command(state: &AppState, channel_id: &str) -> Result<()> {
    info!("Listing models for channel: {}", channel_id);
    let channel = state
        .channel(channel_id)
        .ok_or_else(|| TaggrError::ChannelNotFound(channel_id.to_string()))?;
    let api_key = channel.usable_keys().first().copied().unwrap_or("").to_string();

    let transport = HttpTransport::new();
    let reply = transport
        .fetch_models(&channel.api_url, &api_key)
        .await
        .map_err(|e| TaggrError::Provider(e.to_string()))?;

    if !reply.is_success() {
        bail!("Model listing returned status {}", reply.status);
    }
    let models = reply.model_ids();
    if models.is_empty() {
        println!("{}", "No models reported".yellow());
    } else {
        for model in models {
            println!("{}", model);
        }
    }
    Ok(())
}

fn handle_check_command(state: &AppState) -> Result<()> {
    info!("Running configuration check");
    let report = check_state(state);
    for item in &report.items {
        let level = format!("{:?}", item.level).to_lowercase();
        let level = match item.level {
            taggr::store::DiagnosticLevel::Error => level.red(),
            taggr::store::DiagnosticLevel::Warning => level.yellow(),
            taggr::store::DiagnosticLevel::Info => level.green(),
        };
        println!("  [{}] {} {}", level, item.code, item.message);
    }
    println!(
        "{} {} error(s), {} warning(s)",
        "Summary:".cyan(),
        report.summary.error,
        report.summary.warning
    );
    if report.has_errors() {
        bail!("Configuration check found errors");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load application state
    let state = AppState::load(&cli.state)
        .with_context(|| format!("Failed to load state from {}", cli.state.display()))?;

    info!("Starting with state from: {}", cli.state.display());

    run_application(&cli, &state).await.context("Application failed")?;

    Ok(())
}
