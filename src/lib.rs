pub mod error;
pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod optimizer;
pub mod pipeline;
pub mod scoring;

pub use error::{InvocationError, OptimizeError, OptimizeResult};
pub use heuristics::{extract, HeuristicsConfig};
pub use io::{load_dataset, read_transcript_file, ArtifactCache, ArtifactStore, DatasetOptions};
pub use llm::{AnthropicClient, AnthropicConfig, CompletionBackend, Invoker, InvokerConfig};
pub use models::{ExtractionResult, LabeledExample, ProgramConfiguration, Transcript};
pub use optimizer::{
    optimize_from_path, optimize_from_path_with_config, CancelFlag, OptimizeConfig, Optimizer,
    PersistOutcome, RunReport,
};
pub use pipeline::{ExtractionPath, SummarizeOptions, Summarizer};
pub use scoring::{score, score_breakdown, AggregateScore, ScoreRecord};
