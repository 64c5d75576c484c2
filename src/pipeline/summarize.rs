use serde::Serialize;
use tracing::{debug, info, warn};

use crate::heuristics::{extract, HeuristicsConfig};
use crate::io::ArtifactCache;
use crate::llm::Invoker;
use crate::models::{ExtractionResult, Transcript};

/// Per-call options for summarization
#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    /// Skip the learned path even when an artifact is available
    pub force_heuristic: bool,
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// Pattern extractor, chosen up front
    Heuristic,
    /// Optimized program via the completion backend
    Learned,
    /// Pattern extractor after the learned path failed
    Fallback,
}

/// Entry point for turning a transcript into a summary, action items and decisions
///
/// Uses the persisted program when one exists and a backend is configured,
/// and degrades to the pattern extractor otherwise. Never fails.
#[derive(Clone)]
pub struct Summarizer {
    invoker: Option<Invoker>,
    cache: ArtifactCache,
    heuristics: HeuristicsConfig,
}

impl Summarizer {
    /// Heuristic-only summarizer until an invoker is attached
    pub fn new(cache: ArtifactCache) -> Self {
        Self {
            invoker: None,
            cache,
            heuristics: HeuristicsConfig::default(),
        }
    }

    pub fn with_invoker(mut self, invoker: Invoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicsConfig) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub async fn summarize(&self, transcript: &Transcript, options: &SummarizeOptions) -> ExtractionResult {
        self.summarize_traced(transcript, options).await.0
    }

    /// Summarize and report which path produced the result
    pub async fn summarize_traced(
        &self,
        transcript: &Transcript,
        options: &SummarizeOptions,
    ) -> (ExtractionResult, ExtractionPath) {
        if options.force_heuristic {
            debug!("Heuristic path forced");
            return (self.heuristic(transcript), ExtractionPath::Heuristic);
        }

        let Some(artifact) = self.cache.get() else {
            debug!("No optimized program available, using heuristics");
            return (self.heuristic(transcript), ExtractionPath::Heuristic);
        };

        let Some(invoker) = &self.invoker else {
            debug!("No completion backend configured, using heuristics");
            return (self.heuristic(transcript), ExtractionPath::Heuristic);
        };

        match invoker.invoke(transcript, &artifact.program).await {
            Ok(result) => {
                debug!(
                    "Learned path: {} action items, {} decisions",
                    result.action_items.len(),
                    result.decisions.len()
                );
                (result, ExtractionPath::Learned)
            }
            Err(e) => {
                warn!("Learned program failed ({}), falling back to heuristics", e);
                (self.heuristic(transcript), ExtractionPath::Fallback)
            }
        }
    }

    /// Pick up a newly persisted artifact
    pub fn reload_artifact(&self) -> bool {
        let present = self.cache.reload().is_some();
        info!("Summarizer artifact reloaded (present: {})", present);
        present
    }

    fn heuristic(&self, transcript: &Transcript) -> ExtractionResult {
        extract(transcript, &self.heuristics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ArtifactStore, DEFAULT_FEATURE};
    use crate::llm::fake::{FailingBackend, FakeBackend};
    use crate::models::LabeledExample;
    use crate::optimizer::{CancelFlag, OptimizeConfig, Optimizer};
    use std::sync::Arc;

    const ROADMAP: &str = "Alice: I will send the deck by Friday.\nBob: We decided to postpone the launch.\nCarol: Let's review the roadmap next week.";

    fn roadmap() -> Transcript {
        Transcript::with_participants(ROADMAP, ["Alice", "Bob", "Carol"])
    }

    fn empty_cache() -> (tempfile::TempDir, ArtifactCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(ArtifactStore::new(dir.path(), DEFAULT_FEATURE));
        (dir, cache)
    }

    #[tokio::test]
    async fn test_no_artifact_uses_heuristics() {
        let (_dir, cache) = empty_cache();
        let summarizer = Summarizer::new(cache).with_invoker(Invoker::new(Arc::new(FailingBackend::default())));

        let (result, path) = summarizer.summarize_traced(&roadmap(), &SummarizeOptions::default()).await;

        assert_eq!(path, ExtractionPath::Heuristic);
        assert!(result.action_items.iter().any(|a| a.contains("send the deck")));
        assert!(result.decisions.iter().any(|d| d.contains("postpone the launch")));
        assert!(!result.summary.is_empty());
    }

    #[tokio::test]
    async fn test_failing_backend_falls_back() {
        let (dir, cache) = empty_cache();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);
        store
            .save(&crate::io::Artifact {
                program: crate::models::ProgramConfiguration::default(),
                metadata: crate::io::ArtifactMetadata {
                    run_id: "r".to_string(),
                    created_at: chrono::Utc::now(),
                    aggregate_score: crate::scoring::ScoreRecord::zero(),
                    dataset_size: 1,
                    train_size: 0,
                    validation_size: 1,
                    model: None,
                    iterations_completed: 0,
                },
            })
            .unwrap();
        let backend = Arc::new(FailingBackend::default());
        let summarizer = Summarizer::new(cache).with_invoker(Invoker::new(backend.clone()));

        let expected = extract(&roadmap(), &HeuristicsConfig::default());
        let (result, path) = summarizer.summarize_traced(&roadmap(), &SummarizeOptions::default()).await;

        assert_eq!(path, ExtractionPath::Fallback);
        assert_eq!(result, expected);
        assert!(backend.calls.load(std::sync::atomic::Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_force_heuristic_skips_backend() {
        let (_dir, cache) = empty_cache();
        let backend = Arc::new(FakeBackend::new());
        let summarizer = Summarizer::new(cache).with_invoker(Invoker::new(backend.clone()));
        let options = SummarizeOptions { force_heuristic: true };

        let (_, path) = summarizer.summarize_traced(&roadmap(), &options).await;

        assert_eq!(path, ExtractionPath::Heuristic);
        assert_eq!(backend.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_optimize_then_reload_uses_learned_path() {
        let (dir, cache) = empty_cache();
        let store = ArtifactStore::new(dir.path(), DEFAULT_FEATURE);

        let gold = crate::models::ExtractionResult::new(
            "Deck and launch timing.",
            ["Alice: send the deck by Friday"],
            ["postpone the launch"],
        );
        let examples = vec![
            LabeledExample::new("m1", roadmap(), gold.clone(), true),
            LabeledExample::new(
                "m2",
                Transcript::new("Dan will book the venue."),
                crate::models::ExtractionResult::new("Venue.", ["Dan: book the venue"], Vec::<String>::new()),
                true,
            ),
            LabeledExample::new(
                "m3",
                Transcript::new("The board approved the hire."),
                crate::models::ExtractionResult::new("Hiring.", Vec::<String>::new(), ["approve the hire"]),
                true,
            ),
        ];
        let backend = examples
            .iter()
            .fold(FakeBackend::new(), |b, e| b.with_answer(&e.transcript.text, e.gold.clone()));
        let invoker = Invoker::new(Arc::new(backend));

        let summarizer = Summarizer::new(cache).with_invoker(invoker.clone());
        let (_, before) = summarizer.summarize_traced(&roadmap(), &SummarizeOptions::default()).await;
        assert_eq!(before, ExtractionPath::Heuristic);

        let config = OptimizeConfig {
            iterations: 2,
            ..OptimizeConfig::default()
        };
        Optimizer::new(invoker)
            .with_store(store)
            .optimize(&examples, crate::models::ProgramConfiguration::default(), &config, &CancelFlag::new())
            .await
            .unwrap();

        assert!(summarizer.reload_artifact());
        let (result, after) = summarizer.summarize_traced(&roadmap(), &SummarizeOptions::default()).await;

        assert_eq!(after, ExtractionPath::Learned);
        assert_eq!(result.action_items, gold.action_items);
        assert!(!result.summary.is_empty());
    }
}
