pub mod rules;
pub mod summary;

pub use rules::*;
pub use summary::*;

use tracing::debug;

use crate::models::{ExtractionResult, Transcript, normalize_items};

/// Configuration for the pattern extractor
#[derive(Debug, Clone)]
pub struct HeuristicsConfig {
    /// Cap per category; extra candidates are dropped silently
    pub max_items_per_category: usize,
    /// Sentences kept for the extractive summary
    pub summary_sentences: usize,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            max_items_per_category: 50,
            summary_sentences: 3,
        }
    }
}

/// Extract action items, decisions and a rough summary without any model call
///
/// Runs line by line, then sentence by sentence within each line, through the
/// ordered rule table. Total and linear in the transcript length.
pub fn extract(transcript: &Transcript, config: &HeuristicsConfig) -> ExtractionResult {
    let mut action_items = Vec::new();
    let mut decisions = Vec::new();

    for line in transcript.lines() {
        let context = RuleContext::new(transcript).with_speaker(speaker_label(line));
        for segment in split_sentences(line) {
            if let Some(item) = first_match(Category::ActionItem, segment, &context) {
                action_items.push(item);
            }
            if let Some(item) = first_match(Category::Decision, segment, &context) {
                decisions.push(item);
            }
        }
    }

    let cap = Some(config.max_items_per_category);
    let result = ExtractionResult {
        summary: extractive_summary(&transcript.text, config.summary_sentences),
        action_items: normalize_items(action_items, cap),
        decisions: normalize_items(decisions, cap),
    };

    debug!(
        "Heuristic extraction: {} action items, {} decisions",
        result.action_items.len(),
        result.decisions.len()
    );

    result
}

fn first_match(category: Category, segment: &str, context: &RuleContext<'_>) -> Option<String> {
    rules_for(category).find_map(|rule| {
        let hit = rule.apply(segment, context);
        if hit.is_some() {
            debug!("Rule {} matched: {:?}", rule.name, segment);
        }
        hit
    })
}
