use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{ExtractionResult, LabeledExample, Transcript};

/// Options for loading a labeled dataset
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    /// Keep examples that were never human-reviewed
    pub include_unverified: bool,
    /// Stop after this many examples
    pub limit: Option<usize>,
}

/// Examples plus bookkeeping about what was left out
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// Examples in file order
    pub examples: Vec<LabeledExample>,
    /// 1-based line numbers that failed schema validation
    pub skipped_lines: Vec<usize>,
    /// Valid records dropped because they were unverified
    pub filtered_unverified: usize,
}

impl LoadedDataset {
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped_lines.len()
    }
}

/// One JSONL record as it appears on disk
#[derive(Debug, Deserialize)]
struct DatasetRecord {
    #[serde(default)]
    id: Option<serde_json::Value>,
    meeting_transcript: String,
    #[serde(default)]
    gold_summary: String,
    #[serde(default)]
    action_items: Vec<String>,
    #[serde(default)]
    decisions: Vec<String>,
    #[serde(default)]
    verified: Option<bool>,
    #[serde(default)]
    participants: Vec<String>,
    #[serde(default)]
    owners: Vec<String>,
    #[serde(default)]
    synthetic_strategy: Option<String>,
    #[serde(default)]
    summary_type: Option<String>,
}

impl DatasetRecord {
    fn into_example(self, line_number: usize) -> Option<LabeledExample> {
        if self.meeting_transcript.trim().is_empty() {
            return None;
        }

        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => format!("line_{}", line_number),
            Some(other) => other.to_string(),
        };

        Some(LabeledExample {
            id,
            transcript: Transcript {
                text: self.meeting_transcript,
                participants: self.participants,
            },
            gold: ExtractionResult::new(self.gold_summary, self.action_items, self.decisions),
            verified: self.verified.unwrap_or(false),
            owners: self.owners,
            synthetic_strategy: self.synthetic_strategy,
            summary_type: self.summary_type,
        })
    }
}

/// Load a JSONL dataset of labeled meetings
///
/// Never fails: a missing or unreadable file yields an empty dataset, and
/// malformed lines are skipped and counted. Callers decide whether an empty
/// result is acceptable.
pub fn load_dataset(path: &Path, options: &DatasetOptions) -> LoadedDataset {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Dataset {:?} could not be read: {}", path, e);
            return LoadedDataset::default();
        }
    };

    let dataset = parse_dataset(&String::from_utf8_lossy(&bytes), options);

    info!(
        "Loaded {} examples from {:?} ({} malformed lines skipped, {} unverified filtered)",
        dataset.len(),
        path,
        dataset.skipped(),
        dataset.filtered_unverified
    );

    dataset
}

/// Parse JSONL content into labeled examples
pub fn parse_dataset(content: &str, options: &DatasetOptions) -> LoadedDataset {
    let mut dataset = LoadedDataset::default();

    for (index, line) in content.lines().enumerate() {
        if options.limit.is_some_and(|limit| dataset.examples.len() >= limit) {
            break;
        }

        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let example = serde_json::from_str::<DatasetRecord>(line)
            .map_err(|e| e.to_string())
            .and_then(|record| {
                record
                    .into_example(line_number)
                    .ok_or_else(|| "empty meeting_transcript".to_string())
            });

        match example {
            Ok(example) if !example.verified && !options.include_unverified => {
                dataset.filtered_unverified += 1;
            }
            Ok(example) => dataset.examples.push(example),
            Err(e) => {
                warn!("Skipping dataset line {}: {}", line_number, e);
                dataset.skipped_lines.push(line_number);
            }
        }
    }

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"id": "m1", "meeting_transcript": "Alice will send the deck.", "gold_summary": "Deck review.", "action_items": ["Alice: send the deck"], "verified": true}
{"id": 2, "meeting_transcript": "We decided to hire.", "decisions": ["hire"], "verified": false}

not json at all
{"meeting_transcript": 42}
{"meeting_transcript": "ACTION: book room", "action_items": ["book room", "Book Room"]}
{"gold_summary": "missing transcript", "verified": true}
{"id": "m4", "meeting_transcript": "Bob will call.", "verified": true, "owners": ["Bob"], "synthetic_strategy": "paraphrase"}
"#;

    #[test]
    fn test_parse_verified_only() {
        let dataset = parse_dataset(SAMPLE, &DatasetOptions::default());

        let ids: Vec<&str> = dataset.examples.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m4"]);
        assert_eq!(dataset.skipped_lines, vec![4, 5, 7]);
        assert_eq!(dataset.filtered_unverified, 2);
        assert_eq!(dataset.examples[1].owners, vec!["Bob"]);
        assert!(dataset.examples[1].is_synthetic());
    }

    #[test]
    fn test_parse_include_unverified_preserves_order() {
        let options = DatasetOptions {
            include_unverified: true,
            limit: None,
        };
        let dataset = parse_dataset(SAMPLE, &options);

        let ids: Vec<&str> = dataset.examples.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "2", "line_6", "m4"]);
        // Missing flag defaults to unverified
        assert!(!dataset.examples[2].verified);
        // Gold items are normalized on load
        assert_eq!(dataset.examples[2].gold.action_items, vec!["book room"]);
    }

    #[test]
    fn test_parse_limit() {
        let options = DatasetOptions {
            include_unverified: true,
            limit: Some(2),
        };
        let dataset = parse_dataset(SAMPLE, &options);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dataset = load_dataset(Path::new("/nonexistent/meetings.jsonl"), &DatasetOptions::default());
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_load_all_malformed_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{oops\n[1,2]\n").unwrap();

        let dataset = load_dataset(&path, &DatasetOptions::default());

        assert!(dataset.is_empty());
        assert_eq!(dataset.skipped(), 2);
    }
}
