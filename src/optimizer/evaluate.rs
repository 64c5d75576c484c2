use tracing::debug;

use crate::error::InvocationError;
use crate::llm::Invoker;
use crate::models::{LabeledExample, ProgramConfiguration};
use crate::scoring::{score_breakdown, AggregateScore, ScoreBreakdown};

/// Outcome of running one configuration over the whole dataset
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub aggregate: AggregateScore,
    /// Examples whose invocation failed for any reason
    pub failures: usize,
    /// Subset of `failures` caused by timeouts or transport errors
    pub backend_failures: usize,
    pub last_error: Option<InvocationError>,
}

impl Evaluation {
    /// True when every example failed because the backend could not be reached
    pub fn backend_unreachable(&self) -> bool {
        self.aggregate.n_examples > 0 && self.backend_failures == self.aggregate.n_examples
    }
}

/// Invoke `config` on each example in order and aggregate the scores.
/// A failed invocation scores zero for that example.
pub async fn evaluate(
    invoker: &Invoker,
    config: &ProgramConfiguration,
    examples: &[LabeledExample],
) -> Evaluation {
    let mut breakdowns = Vec::with_capacity(examples.len());
    let mut failures = 0;
    let mut backend_failures = 0;
    let mut last_error = None;

    for example in examples {
        match invoker.invoke(&example.transcript, config).await {
            Ok(prediction) => breakdowns.push(score_breakdown(&prediction, &example.gold)),
            Err(e) => {
                debug!("Example {} failed: {}", example.id, e);
                failures += 1;
                if e.is_backend_failure() {
                    backend_failures += 1;
                }
                last_error = Some(e);
                breakdowns.push(ScoreBreakdown::zero());
            }
        }
    }

    Evaluation {
        aggregate: AggregateScore::aggregate(&breakdowns),
        failures,
        backend_failures,
        last_error,
    }
}
