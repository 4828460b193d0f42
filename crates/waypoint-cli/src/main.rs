//! Waypoint CLI.
//!
//! Generates learning content through the model cascade and prints it as
//! pretty JSON `{ "content": ..., "meta": ... }`. Generation commands always
//! print something: when every model fails the content is static fallback
//! and `meta.fallback_used` is true.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use waypoint_core::{
    FallbackContext, FallbackProvider, FallbackReason, GenerationMeta, SchemaKind,
};
use waypoint_runtime::{AuxiliaryContext, GenerationOutcome, GenerationPipeline, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Roadmap { goal, context } => {
            let pipeline = GenerationPipeline::from_config(&config)?;
            let params = cli.generation.apply(pipeline.default_parameters());
            let outcome = pipeline
                .generate_roadmap(&goal, &AuxiliaryContext::from(context), params)
                .await;
            print_outcome(&outcome)
        }
        Commands::Quiz { topic, context } => {
            let pipeline = GenerationPipeline::from_config(&config)?;
            let params = cli.generation.apply(pipeline.default_parameters());
            let outcome = pipeline
                .generate_quiz(&topic, &AuxiliaryContext::from(context), params)
                .await;
            print_outcome(&outcome)
        }
        Commands::Lesson { module, goal, context } => {
            let pipeline = GenerationPipeline::from_config(&config)?;
            let params = cli.generation.apply(pipeline.default_parameters());
            let outcome = pipeline
                .generate_lesson(&module, &goal, &AuxiliaryContext::from(context), params)
                .await;
            print_outcome(&outcome)
        }
        Commands::Check { schema, file } => check(&config, schema, &file),
        Commands::Fallback { schema, subject } => print_json(&requested_fallback(schema, subject)),
    }
}

/// Static content asked for directly. No model is tried.
fn requested_fallback(schema: SchemaKind, subject: String) -> GenerationOutcome {
    GenerationOutcome {
        content: FallbackProvider::new().fallback(schema, &FallbackContext::new(subject)),
        meta: GenerationMeta::fallback(FallbackReason::Requested, "fallback command", 0),
    }
}

/// Run a saved raw response through normalization and validation.
fn check(config: &RuntimeConfig, schema: SchemaKind, file: &Path) -> Result<()> {
    let raw = read_input(file)?;
    let sanitizer = config.sanitizer()?;

    let content = waypoint_core::process(&raw, schema, &sanitizer)
        .with_context(|| format!("{} failed {} validation", file.display(), schema))?;

    tracing::info!(schema = %schema, "Response is valid");
    print_json(&content)
}

fn read_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn print_outcome(outcome: &GenerationOutcome) -> Result<()> {
    if outcome.is_fallback() {
        tracing::warn!(
            reason = ?outcome.meta.reason,
            "No model produced valid content; printing fallback"
        );
    }
    print_json(outcome)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
