pub mod evaluate;
pub mod proposal;

pub use evaluate::*;
pub use proposal::*;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{OptimizeError, OptimizeResult};
use crate::io::{load_dataset, Artifact, ArtifactMetadata, ArtifactStore, DatasetOptions};
use crate::llm::{AnthropicClient, AnthropicConfig, Invoker};
use crate::models::{LabeledExample, ProgramConfiguration};
use crate::scoring::AggregateScore;

/// Configuration for an optimization run
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    /// Number of propose/evaluate rounds
    pub iterations: usize,
    /// Seed for the proposal generator
    pub seed: u64,
    /// Train on examples that were never human-reviewed
    pub include_unverified: bool,
    /// Upper bound on exemplars in a candidate
    pub max_exemplars: usize,
    /// Model identifier recorded in the artifact and passed to the backend
    pub model: Option<String>,
    /// Stop reading the dataset after this many examples
    pub dataset_limit: Option<usize>,
    /// Fraction of examples used as the exemplar pool; the rest are scored
    pub train_split: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            seed: 42,
            include_unverified: false,
            max_exemplars: 4,
            model: None,
            dataset_limit: None,
            train_split: 0.8,
        }
    }
}

impl OptimizeConfig {
    /// Named presets trading run time for search breadth
    pub fn from_preset(name: &str) -> Result<Self> {
        let (iterations, max_exemplars, include_unverified, train_split) = match name {
            "quick" => (1, 2, false, 0.8),
            "development" => (2, 3, true, 0.8),
            "production" => (10, 8, false, 0.8),
            "thorough" => (15, 12, false, 0.8),
            other => anyhow::bail!(
                "Unknown preset '{}' (expected quick, development, production or thorough)",
                other
            ),
        };

        Ok(Self {
            iterations,
            max_exemplars,
            include_unverified,
            train_split,
            ..Self::default()
        })
    }
}

/// Examples divided into an exemplar pool and a disjoint scoring set
#[derive(Debug, Clone, Copy)]
pub struct DatasetSplit<'a> {
    /// Exemplars are drawn from here
    pub train: &'a [LabeledExample],
    /// Candidates are scored on these
    pub validation: &'a [LabeledExample],
}

/// Split in file order: the first `train_split` share trains, the rest validates.
/// The validation side always keeps at least the last example.
pub fn split_dataset(examples: &[LabeledExample], train_split: f64) -> DatasetSplit<'_> {
    let n = examples.len();
    let wanted = (train_split.clamp(0.0, 1.0) * n as f64).floor() as usize;
    let (train, validation) = examples.split_at(wanted.min(n.saturating_sub(1)));
    DatasetSplit { train, validation }
}

/// Cooperative cancellation shared between the caller and a running optimization
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One propose/evaluate round
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub mutation: Mutation,
    pub score: AggregateScore,
    pub failures: usize,
    /// Candidate replaced the best configuration
    pub improved: bool,
}

/// What happened when the best configuration was persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved { path: PathBuf },
    Failed { reason: String },
    /// No store was configured
    Skipped,
}

/// Summary of an optimization run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub base_score: AggregateScore,
    pub best_score: AggregateScore,
    pub iterations_requested: usize,
    pub iterations_completed: usize,
    /// Number of times the best configuration was replaced
    pub improvements: usize,
    pub cancelled: bool,
    /// Failed invocations across all evaluations, base included
    pub invocation_failures: usize,
    pub dataset_size: usize,
    /// Examples available as exemplars
    pub train_size: usize,
    /// Examples every candidate was scored on
    pub validation_size: usize,
    pub persisted: PersistOutcome,
    pub history: Vec<IterationRecord>,
}

/// Best configuration found plus the run report
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub best_config: ProgramConfiguration,
    pub best_score: AggregateScore,
    pub report: RunReport,
}

/// Searches for a better program configuration against a labeled dataset
pub struct Optimizer {
    invoker: Invoker,
    store: Option<ArtifactStore>,
}

impl Optimizer {
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            store: None,
        }
    }

    /// Persist the best configuration to this store when the run finishes
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the search with the seeded default proposer
    pub async fn optimize(
        &self,
        examples: &[LabeledExample],
        base: ProgramConfiguration,
        config: &OptimizeConfig,
        cancel: &CancelFlag,
    ) -> OptimizeResult<OptimizationOutcome> {
        let mut proposer = SeededProposer::new(config.seed, config.max_exemplars);
        self.optimize_with(examples, base, config, cancel, &mut proposer)
            .await
    }

    /// Run the search with a caller-supplied proposal strategy
    ///
    /// The run proceeds in four phases:
    /// 1. Validate inputs, split the examples and score the base configuration
    /// 2. Propose a perturbation of the current best from the train split
    /// 3. Score the candidate over every validation example, in order
    /// 4. Keep the candidate only if its pooled F1 is strictly higher
    ///
    /// Cancellation is checked before each proposal. The best configuration
    /// is persisted at the end whether or not the run was cancelled.
    pub async fn optimize_with(
        &self,
        examples: &[LabeledExample],
        base: ProgramConfiguration,
        config: &OptimizeConfig,
        cancel: &CancelFlag,
        proposer: &mut dyn ProposalStrategy,
    ) -> OptimizeResult<OptimizationOutcome> {
        if examples.is_empty() {
            return Err(OptimizeError::EmptyDataset {
                source_name: "<in-memory>".to_string(),
                skipped: 0,
            });
        }

        let validation = base.validate();
        if !validation.is_valid {
            return Err(OptimizeError::InvalidBaseConfig(validation.errors.join("; ")));
        }

        let split = split_dataset(examples, config.train_split);
        let run_id = Uuid::new_v4().to_string();
        info!(
            "Optimization run {}: {} train / {} validation examples, {} iterations, backend {}",
            run_id,
            split.train.len(),
            split.validation.len(),
            config.iterations,
            self.invoker.backend_name()
        );

        let base_eval = evaluate(&self.invoker, &base, split.validation).await;
        if base_eval.backend_unreachable() {
            let reason = base_eval
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(OptimizeError::BackendUnreachable(reason));
        }

        info!(
            "Base configuration: f1 {:.3} ({} failures)",
            base_eval.aggregate.pooled.f1, base_eval.failures
        );

        let base_score = base_eval.aggregate;
        let mut best_config = base;
        let mut best_score = base_score;
        let mut invocation_failures = base_eval.failures;
        let mut improvements = 0;
        let mut iterations_completed = 0;
        let mut cancelled = false;
        let mut history = Vec::with_capacity(config.iterations);

        for iteration in 1..=config.iterations {
            if cancel.is_cancelled() {
                info!("Optimization cancelled before iteration {}", iteration);
                cancelled = true;
                break;
            }

            let proposal = proposer.propose(&best_config, split.train);
            let candidate_validation = proposal.config.validate();
            if !candidate_validation.is_valid {
                warn!(
                    "Iteration {}: discarding invalid candidate: {:?}",
                    iteration, candidate_validation.errors
                );
                iterations_completed += 1;
                continue;
            }

            let evaluation = evaluate(&self.invoker, &proposal.config, split.validation).await;
            invocation_failures += evaluation.failures;

            let improved = evaluation.aggregate.pooled.f1 > best_score.pooled.f1;
            info!(
                "Iteration {}/{} ({:?}): f1 {:.3} vs best {:.3}{}",
                iteration,
                config.iterations,
                proposal.mutation,
                evaluation.aggregate.pooled.f1,
                best_score.pooled.f1,
                if improved { " - new best" } else { "" }
            );

            history.push(IterationRecord {
                iteration,
                mutation: proposal.mutation,
                score: evaluation.aggregate,
                failures: evaluation.failures,
                improved,
            });

            if improved {
                best_config = proposal.config;
                best_score = evaluation.aggregate;
                improvements += 1;
            }
            iterations_completed += 1;
        }

        let metadata = ArtifactMetadata {
            run_id: run_id.clone(),
            created_at: Utc::now(),
            aggregate_score: best_score.pooled,
            dataset_size: examples.len(),
            train_size: split.train.len(),
            validation_size: split.validation.len(),
            model: config
                .model
                .clone()
                .or_else(|| Some(self.invoker.backend_name().to_string())),
            iterations_completed,
        };
        let persisted = self.persist(&best_config, metadata);

        let report = RunReport {
            run_id,
            base_score,
            best_score,
            iterations_requested: config.iterations,
            iterations_completed,
            improvements,
            cancelled,
            invocation_failures,
            dataset_size: examples.len(),
            train_size: split.train.len(),
            validation_size: split.validation.len(),
            persisted,
            history,
        };

        Ok(OptimizationOutcome {
            best_config,
            best_score,
            report,
        })
    }

    /// Load a JSONL dataset and optimize from the default program
    pub async fn optimize_dataset(
        &self,
        path: &Path,
        config: &OptimizeConfig,
        cancel: &CancelFlag,
    ) -> OptimizeResult<OptimizationOutcome> {
        let examples = load_examples(path, config)?;
        self.optimize(&examples, base_program(config), config, cancel)
            .await
    }

    fn persist(&self, best_config: &ProgramConfiguration, metadata: ArtifactMetadata) -> PersistOutcome {
        let Some(store) = &self.store else {
            return PersistOutcome::Skipped;
        };

        let artifact = Artifact {
            program: best_config.clone(),
            metadata,
        };

        match store.save(&artifact) {
            Ok(path) => PersistOutcome::Saved { path },
            Err(e) => {
                warn!("Could not persist optimized program: {:#}", e);
                PersistOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}

/// Default program with the exemplar bound taken from the run configuration
fn base_program(config: &OptimizeConfig) -> ProgramConfiguration {
    let mut program = ProgramConfiguration::default();
    program.hyperparameters.max_exemplars = config.max_exemplars;
    program
}

fn load_examples(path: &Path, config: &OptimizeConfig) -> OptimizeResult<Vec<LabeledExample>> {
    let options = DatasetOptions {
        include_unverified: config.include_unverified,
        limit: config.dataset_limit,
    };
    let dataset = load_dataset(path, &options);

    if dataset.is_empty() {
        return Err(OptimizeError::EmptyDataset {
            source_name: path.display().to_string(),
            skipped: dataset.skipped(),
        });
    }

    Ok(dataset.examples)
}

/// Optimize against a dataset file using the Anthropic backend and the default artifact location
pub async fn optimize_from_path(
    dataset_path: &Path,
    iterations: usize,
    include_unverified: bool,
    model_identifier: Option<&str>,
) -> OptimizeResult<RunReport> {
    let config = OptimizeConfig {
        iterations,
        include_unverified,
        model: model_identifier.map(str::to_string),
        ..OptimizeConfig::default()
    };

    optimize_from_path_with_config(dataset_path, config, &CancelFlag::new()).await
}

/// Like [`optimize_from_path`] but with a full configuration and a caller-held cancel flag
pub async fn optimize_from_path_with_config(
    dataset_path: &Path,
    config: OptimizeConfig,
    cancel: &CancelFlag,
) -> OptimizeResult<RunReport> {
    let examples = load_examples(dataset_path, &config)?;

    let anthropic = AnthropicConfig::from_env()
        .map_err(|e| OptimizeError::Backend(format!("{:#}", e)))?
        .with_model(config.model.as_deref());
    let invoker = Invoker::new(Arc::new(AnthropicClient::new(anthropic)));

    let optimizer = Optimizer::new(invoker).with_store(ArtifactStore::default_location());
    let outcome = optimizer
        .optimize(&examples, base_program(&config), &config, cancel)
        .await?;

    Ok(outcome.report)
}
