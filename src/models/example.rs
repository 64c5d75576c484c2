use serde::{Deserialize, Serialize};

use super::{ExtractionResult, Transcript};

/// One labeled meeting from the optimization dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Record identifier from the dataset (line number when absent)
    pub id: String,
    pub transcript: Transcript,
    /// Gold summary, action items and decisions
    pub gold: ExtractionResult,
    /// Human-reviewed ground truth when true
    pub verified: bool,
    /// Owners named for the gold action items
    #[serde(default)]
    pub owners: Vec<String>,
    /// How a synthetic example was generated, if it was
    #[serde(default)]
    pub synthetic_strategy: Option<String>,
    /// Style of the gold summary (e.g. "bullets", "narrative")
    #[serde(default)]
    pub summary_type: Option<String>,
}

impl LabeledExample {
    pub fn new(id: impl Into<String>, transcript: Transcript, gold: ExtractionResult, verified: bool) -> Self {
        Self {
            id: id.into(),
            transcript,
            gold,
            verified,
            owners: Vec::new(),
            synthetic_strategy: None,
            summary_type: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic_strategy.is_some()
    }
}
