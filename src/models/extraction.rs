use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Number of action items surfaced as next steps
pub const NEXT_STEPS_LIMIT: usize = 5;

/// Structured output of either extraction path
///
/// The heuristic and learned paths both produce this shape, so consumers never
/// need to know which one ran. Items are always trimmed, non-empty and unique
/// under case-insensitive comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Narrative summary of the meeting
    pub summary: String,
    /// Action items, first-seen order
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Decisions, first-seen order
    #[serde(default)]
    pub decisions: Vec<String>,
}

impl ExtractionResult {
    /// Build a result, normalizing both item lists
    pub fn new<A, D>(summary: impl Into<String>, action_items: A, decisions: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            summary: summary.into().trim().to_string(),
            action_items: normalize_items(action_items, None),
            decisions: normalize_items(decisions, None),
        }
    }

    /// Re-apply the item invariants to a result built field by field
    pub fn normalized(self) -> Self {
        Self::new(self.summary, self.action_items, self.decisions)
    }

    /// The first few action items, used as a short to-do list
    pub fn next_steps(&self) -> &[String] {
        let end = self.action_items.len().min(NEXT_STEPS_LIMIT);
        &self.action_items[..end]
    }

    /// Total number of extracted items across both categories
    pub fn item_count(&self) -> usize {
        self.action_items.len() + self.decisions.len()
    }
}

/// Comparison key for an item: trimmed, lower-cased, whitespace collapsed
pub fn normalize_key(item: &str) -> String {
    item.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim, drop empties and deduplicate case-insensitively, keeping first-seen order.
/// With a cap, anything past it is silently dropped.
pub fn normalize_items<I>(items: I, cap: Option<usize>) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        if cap.is_some_and(|c| out.len() >= c) {
            break;
        }
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(normalize_key(trimmed)) {
            out.push(trimmed.to_string());
        }
    }

    out
}
