//! Per-example quality metrics.
//!
//! | Metric        | Compares                              | Range   |
//! |---------------|---------------------------------------|---------|
//! | overlap_score | Jaccard over summary word tokens      | 0.0-1.0 |
//! | precision     | exact-match items, pooled categories  | 0.0-1.0 |
//! | recall        | exact-match items, pooled categories  | 0.0-1.0 |
//! | f1            | harmonic mean of precision and recall | 0.0-1.0 |
//!
//! Pooled matching tags each item with its category before comparing, so an
//! action item never matches a decision with the same text. Per-category
//! numbers are kept alongside in [`ScoreBreakdown`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{ExtractionResult, normalize_key};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("Invalid token regex"));

/// Precision / recall / F1 triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Prf {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Prf {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Quality of one prediction against its gold example
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub overlap_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ScoreRecord {
    /// Score assigned to an example whose invocation failed
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_parts(overlap_score: f64, prf: Prf) -> Self {
        Self {
            overlap_score,
            precision: prf.precision,
            recall: prf.recall,
            f1: prf.f1,
        }
    }
}

/// Pooled score plus the per-category figures it was built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub pooled: ScoreRecord,
    pub action_items: Prf,
    pub decisions: Prf,
}

impl ScoreBreakdown {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// P/R/F1 from match counts
///
/// Both sides empty is a perfect match. An empty side otherwise scores 0 for
/// its ratio; precision is never vacuously 1 against a non-empty gold.
pub fn prf_from_counts(tp: usize, pred_total: usize, gold_total: usize) -> Prf {
    if pred_total == 0 && gold_total == 0 {
        return Prf {
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        };
    }

    let precision = if pred_total > 0 {
        tp as f64 / pred_total as f64
    } else {
        0.0
    };
    let recall = if gold_total > 0 {
        tp as f64 / gold_total as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Prf {
        precision,
        recall,
        f1,
    }
}

fn tokens(text: &str) -> HashSet<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Jaccard similarity of the case-folded word sets; both empty counts as identical
pub fn summary_overlap(predicted: &str, gold: &str) -> f64 {
    let p = tokens(predicted);
    let g = tokens(gold);

    if p.is_empty() && g.is_empty() {
        return 1.0;
    }

    let intersection = p.intersection(&g).count();
    let union = p.union(&g).count();
    intersection as f64 / union as f64
}

fn item_set<'a>(items: impl IntoIterator<Item = &'a String>, tag: &str) -> HashSet<String> {
    items
        .into_iter()
        .map(|i| normalize_key(i))
        .filter(|k| !k.is_empty())
        .map(|k| format!("{}:{}", tag, k))
        .collect()
}

fn set_prf(predicted: &HashSet<String>, gold: &HashSet<String>) -> Prf {
    let tp = predicted.intersection(gold).count();
    prf_from_counts(tp, predicted.len(), gold.len())
}

/// Case-insensitive exact-match P/R/F1 over two item lists
pub fn list_exact_match(predicted: &[String], gold: &[String]) -> Prf {
    set_prf(&item_set(predicted, "item"), &item_set(gold, "item"))
}

/// Pooled score for one prediction
pub fn score(predicted: &ExtractionResult, gold: &ExtractionResult) -> ScoreRecord {
    score_breakdown(predicted, gold).pooled
}

/// Pooled score plus per-category P/R/F1
pub fn score_breakdown(predicted: &ExtractionResult, gold: &ExtractionResult) -> ScoreBreakdown {
    let overlap = summary_overlap(&predicted.summary, &gold.summary);

    let mut pred_pool = item_set(&predicted.action_items, "action");
    pred_pool.extend(item_set(&predicted.decisions, "decision"));
    let mut gold_pool = item_set(&gold.action_items, "action");
    gold_pool.extend(item_set(&gold.decisions, "decision"));

    ScoreBreakdown {
        pooled: ScoreRecord::from_parts(overlap, set_prf(&pred_pool, &gold_pool)),
        action_items: list_exact_match(&predicted.action_items, &gold.action_items),
        decisions: list_exact_match(&predicted.decisions, &gold.decisions),
    }
}
