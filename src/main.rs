use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use recap::{
    optimize_from_path_with_config, read_transcript_file, AnthropicClient, AnthropicConfig,
    ArtifactCache, ArtifactStore, CancelFlag, ExtractionPath, ExtractionResult, Invoker,
    OptimizeConfig, PersistOutcome, SummarizeOptions, Summarizer,
};

#[derive(Parser)]
#[command(name = "recap")]
#[command(author, version, about = "Meeting summaries, action items and decisions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a meeting transcript
    Summarize {
        /// Transcript file (plain text, or JSON with text and participants)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the optimized program and use pattern rules only
        #[arg(long)]
        heuristic: bool,

        /// Model identifier for the learned path
        #[arg(long)]
        model: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Optimize the extraction program against a labeled JSONL dataset
    Optimize {
        /// Labeled dataset (JSONL)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Named preset: quick, development, production or thorough
        #[arg(long)]
        preset: Option<String>,

        /// Number of iterations (overrides the preset)
        #[arg(long)]
        iterations: Option<usize>,

        /// Include examples that were never human-reviewed
        #[arg(long)]
        include_unverified: bool,

        /// Seed for candidate proposals
        #[arg(long)]
        seed: Option<u64>,

        /// Use at most this many examples
        #[arg(long)]
        limit: Option<usize>,

        /// Fraction of examples used as exemplars (the rest are scored)
        #[arg(long)]
        train_split: Option<f64>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    path: ExtractionPath,
    #[serde(flatten)]
    result: &'a ExtractionResult,
    next_steps: &'a [String],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize {
            input,
            output,
            heuristic,
            model,
            verbose,
        } => {
            setup_logging(verbose);
            summarize(input, output, heuristic, model).await
        }
        Commands::Optimize {
            dataset,
            preset,
            iterations,
            include_unverified,
            seed,
            limit,
            train_split,
            model,
            verbose,
        } => {
            setup_logging(verbose);

            let mut config = match preset.as_deref() {
                Some(name) => OptimizeConfig::from_preset(name)?,
                None => OptimizeConfig::default(),
            };
            if let Some(iterations) = iterations {
                config.iterations = iterations;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(train_split) = train_split {
                config.train_split = train_split;
            }
            config.include_unverified |= include_unverified;
            config.dataset_limit = limit;
            config.model = model;

            optimize(dataset, config).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn summarize(
    input: PathBuf,
    output: Option<PathBuf>,
    heuristic: bool,
    model: Option<String>,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let transcript = read_transcript_file(&input).context("Failed to read input transcript")?;

    let cache = ArtifactCache::new(ArtifactStore::default_location());
    let mut summarizer = Summarizer::new(cache);

    if !heuristic {
        match AnthropicConfig::from_env() {
            Ok(config) => {
                let client = AnthropicClient::new(config.with_model(model.as_deref()));
                summarizer = summarizer.with_invoker(Invoker::new(Arc::new(client)));
            }
            Err(e) => warn!("{:#}; learned path disabled", e),
        }
    }

    let options = SummarizeOptions {
        force_heuristic: heuristic,
    };
    let (result, path) = summarizer.summarize_traced(&transcript, &options).await;
    info!(
        "Extracted via {:?}: {} action items, {} decisions",
        path,
        result.action_items.len(),
        result.decisions.len()
    );

    let json = serde_json::to_string_pretty(&SummaryOutput {
        path,
        result: &result,
        next_steps: result.next_steps(),
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Output written to {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn optimize(dataset: PathBuf, config: OptimizeConfig) -> Result<()> {
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing with the best configuration so far");
            on_signal.cancel();
        }
    });

    let report = optimize_from_path_with_config(&dataset, config, &cancel).await?;

    match &report.persisted {
        PersistOutcome::Saved { path } => info!("Optimized program saved to {:?}", path),
        PersistOutcome::Failed { reason } => warn!("Optimized program not saved: {}", reason),
        PersistOutcome::Skipped => {}
    }
    info!(
        "Complete: f1 {:.3} -> {:.3} over {} iterations ({} improvements)",
        report.base_score.pooled.f1,
        report.best_score.pooled.f1,
        report.iterations_completed,
        report.improvements
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
