use serde::Deserialize;
use serde_json::Value;

use crate::models::ExtractionResult;

/// Completion shape accepted without repair
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictCompletion {
    summary: String,
    action_items: Vec<String>,
    decisions: Vec<String>,
}

/// Parse a completion that must match the output contract exactly
///
/// All three fields are required, lists must hold strings, and the summary
/// must not be blank.
pub fn parse_completion(raw: &str) -> Result<ExtractionResult, String> {
    let parsed: StrictCompletion =
        serde_json::from_str(raw.trim()).map_err(|e| format!("not valid completion JSON: {}", e))?;

    if parsed.summary.trim().is_empty() {
        return Err("summary is empty".to_string());
    }

    Ok(ExtractionResult::new(
        parsed.summary,
        parsed.action_items,
        parsed.decisions,
    ))
}

/// Best-effort recovery of a completion that failed strict parsing
///
/// Strips markdown fences and prose around the outermost JSON object, then
/// accepts looser field shapes: a summary given as a list of sentences, and
/// items given as a single string or as objects with a `task`, `decision` or
/// `text` key.
pub fn repair_completion(raw: &str) -> Result<ExtractionResult, String> {
    let body = extract_json_object(raw).ok_or_else(|| "no JSON object in completion".to_string())?;
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("unrecoverable JSON: {}", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| "completion is not a JSON object".to_string())?;

    let summary = match object.get("summary") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return Err("summary missing or not text".to_string()),
    };
    if summary.trim().is_empty() {
        return Err("summary is empty".to_string());
    }

    let action_items = lenient_items(object.get("action_items"))?;
    let decisions = lenient_items(object.get("decisions"))?;

    Ok(ExtractionResult::new(summary, action_items, decisions))
}

/// Slice from the first `{` to the last `}`
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn lenient_items(value: Option<&Value>) -> Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => Ok(items.iter().filter_map(item_text).collect()),
        Some(other) => Err(format!("unexpected item list: {}", other)),
    }
}

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            let text = ["task", "decision", "text"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))?;
            match map
                .get("assignee")
                .or_else(|| map.get("owner"))
                .and_then(Value::as_str)
            {
                Some(owner) if !owner.trim().is_empty() => Some(format!("{}: {}", owner.trim(), text.trim())),
                _ => Some(text.to_string()),
            }
        }
        _ => None,
    }
}
