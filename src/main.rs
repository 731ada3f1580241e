//! Concierge - Main CLI Entry Point

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concierge::{
    cli::{Args, Commands, Verbosity},
    config::{Config, ProviderKind},
    extraction::DocumentSource,
    providers::OllamaClient,
    server, RagPipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await?;
        }
        Commands::Ingest { files } => {
            ingest_files(&config, &files, verbosity).await?;
        }
        Commands::Ask {
            question,
            show_context,
        } => {
            ask(&config, &question, show_context, verbosity).await?;
        }
        Commands::Health => {
            health(&config).await?;
        }
        Commands::Config => {
            show_config(&config, args.config)?;
        }
    }

    Ok(())
}

fn init_tracing(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn spinner(message: String, verbosity: Verbosity) -> Result<ProgressBar> {
    if !verbosity.show_progress() {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn serve(config: &Config) -> Result<()> {
    let pipeline = Arc::new(RagPipeline::from_config(config).await?);

    println!("{}", "Concierge API".bold().cyan());
    println!("  POST /api/rag/ingest   upload a document (field \"pdf\")");
    println!("  POST /api/rag/ask      {{\"question\": \"...\"}}");
    println!("  GET  /api/rag/health");
    println!();

    server::serve(&config.server, pipeline).await?;
    Ok(())
}

async fn ingest_files(config: &Config, files: &[PathBuf], verbosity: Verbosity) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let mut failures = 0;

    for file in files {
        let pb = spinner(format!("Ingesting {}", file.display()), verbosity)?;
        let result = pipeline.ingest(&DocumentSource::path(file)).await;
        pb.finish_and_clear();

        match result {
            Ok(report) => println!(
                "{} {} ({} passages, {}ms)",
                "✓".green(),
                report.document,
                report.passages_stored,
                report.duration_ms()
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                if e.passages_stored() > 0 {
                    eprintln!(
                        "  {}",
                        format!("{} passages were stored before the failure", e.passages_stored())
                            .yellow()
                    );
                }
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} documents failed to ingest", failures, files.len());
    }
    Ok(())
}

async fn ask(config: &Config, question: &str, show_context: bool, verbosity: Verbosity) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;

    let pb = spinner("Thinking...".to_string(), verbosity)?;
    let result = pipeline.ask(question).await;
    pb.finish_and_clear();
    let answer = result?;

    if show_context {
        println!("{}", "Context:".bold());
        if answer.context.is_empty() {
            println!("  {}", "(no passages stored)".dimmed());
        }
        for (rank, passage) in answer.context.passages.iter().enumerate() {
            println!(
                "  {}. [{:.3}] {}",
                rank + 1,
                passage.distance,
                passage.content.dimmed()
            );
        }
        println!();
    }

    println!("{}", answer.answer);
    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let status = pipeline.health()?;
    let passages = pipeline.passage_count().await?;

    println!("{} {}", "✓".green(), status);
    println!("  Passages stored: {}", passages);

    if config.providers.kind == ProviderKind::Ollama {
        let ollama = OllamaClient::from_config(&config.providers)?;
        if ollama.health_check().await {
            println!("  Ollama: {} ({})", "reachable".green(), ollama.base_url());
        } else {
            println!("  Ollama: {} ({})", "unreachable".red(), ollama.base_url());
        }
    }
    Ok(())
}

fn show_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::config_path()?,
    };
    println!("{} {}", "Configuration:".bold(), path.display());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
