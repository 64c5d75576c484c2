use serde::{Deserialize, Serialize};

use super::{Prf, ScoreBreakdown, ScoreRecord};

/// Dataset-level scores: the arithmetic mean of every per-example field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    /// Mean pooled score (ranks configurations by `f1`)
    pub pooled: ScoreRecord,
    /// Mean action-item P/R/F1
    pub action_items: Prf,
    /// Mean decision P/R/F1
    pub decisions: Prf,
    /// Number of examples aggregated, failures included
    pub n_examples: usize,
}

impl AggregateScore {
    /// Aggregate per-example breakdowns. Failed examples are expected to be
    /// passed in as [`ScoreBreakdown::zero`].
    pub fn aggregate(per_example: &[ScoreBreakdown]) -> Self {
        if per_example.is_empty() {
            return Self::default();
        }

        let pooled: Vec<ScoreRecord> = per_example.iter().map(|b| b.pooled).collect();
        let actions: Vec<Prf> = per_example.iter().map(|b| b.action_items).collect();
        let decisions: Vec<Prf> = per_example.iter().map(|b| b.decisions).collect();

        Self {
            pooled: mean_record(&pooled),
            action_items: mean_prf(&actions),
            decisions: mean_prf(&decisions),
            n_examples: per_example.len(),
        }
    }
}

/// Field-wise mean of score records; zero for an empty slice
pub fn mean_record(records: &[ScoreRecord]) -> ScoreRecord {
    ScoreRecord {
        overlap_score: mean(records.iter().map(|r| r.overlap_score)),
        precision: mean(records.iter().map(|r| r.precision)),
        recall: mean(records.iter().map(|r| r.recall)),
        f1: mean(records.iter().map(|r| r.f1)),
    }
}

fn mean_prf(values: &[Prf]) -> Prf {
    Prf {
        precision: mean(values.iter().map(|p| p.precision)),
        recall: mean(values.iter().map(|p| p.recall)),
        f1: mean(values.iter().map(|p| p.f1)),
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}
