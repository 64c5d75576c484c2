use std::path::Path;

use anyhow::{Context, Result};

use crate::heuristics::speaker_label;
use crate::models::{Transcript, normalize_items};

/// Read a transcript file: JSON (`{"text": ..., "participants": [...]}`) when the
/// extension is `.json`, plain text otherwise
pub fn read_transcript_file(path: &Path) -> Result<Transcript> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_transcript_json(&content)
    } else {
        Ok(parse_transcript_text(&content))
    }
}

/// Parse a JSON transcript
pub fn parse_transcript_json(json: &str) -> Result<Transcript> {
    let transcript: Transcript =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;
    Ok(transcript)
}

/// Wrap plain text, inferring participants from speaker labels
pub fn parse_transcript_text(text: &str) -> Transcript {
    let participants = infer_participants(text);
    Transcript {
        text: text.to_string(),
        participants,
    }
}

/// Distinct speaker labels in first-seen order
pub fn infer_participants(text: &str) -> Vec<String> {
    normalize_items(text.lines().filter_map(speaker_label), None)
}
