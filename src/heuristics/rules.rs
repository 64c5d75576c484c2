//! Ordered rule table for the pattern extractor.
//!
//! Each rule pairs a regex with an extractor function. Rules are tried in
//! table order and the first hit per category wins for a segment, so more
//! specific cues sit above the general ones.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::Transcript;

/// Which output list a rule feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ActionItem,
    Decision,
}

/// What a rule can see beyond the segment itself
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub transcript: &'a Transcript,
    /// Speaker label of the line the segment came from
    pub speaker: Option<&'a str>,
}

impl<'a> RuleContext<'a> {
    pub fn new(transcript: &'a Transcript) -> Self {
        Self {
            transcript,
            speaker: None,
        }
    }

    pub fn with_speaker(mut self, speaker: Option<&'a str>) -> Self {
        self.speaker = speaker;
        self
    }
}

type ExtractFn = fn(&Captures<'_>, &RuleContext<'_>) -> Option<String>;

/// A single matcher/extractor pair
pub struct Rule {
    pub name: &'static str,
    pub category: Category,
    pattern: Regex,
    extract: ExtractFn,
}

impl Rule {
    fn new(name: &'static str, category: Category, pattern: &str, extract: ExtractFn) -> Self {
        Self {
            name,
            category,
            pattern: Regex::new(pattern).expect("Invalid heuristic rule regex"),
            extract,
        }
    }

    /// Run the rule against one segment
    pub fn apply(&self, segment: &str, context: &RuleContext<'_>) -> Option<String> {
        let caps = self.pattern.captures(segment)?;
        (self.extract)(&caps, context)
    }
}

/// Words that can precede "will" without naming an owner
const NON_OWNERS: &[&str] = &[
    "i", "we", "you", "they", "he", "she", "it", "this", "that", "these", "those", "there",
    "who", "which", "what", "someone", "somebody", "everyone", "everybody", "nobody", "anyone",
    "team", "it'll", "that'll",
];

/// Capitalized words that are never people
const CALENDAR_WORDS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "today",
    "tomorrow", "tonight", "january", "february", "march", "april", "may", "june", "july",
    "august", "september", "october", "november", "december", "next", "q1", "q2", "q3", "q4",
];

/// "Name:" or "First Last:" at the start of a line
static SPEAKER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Z][\w.'-]*(?:\s[A-Z][\w.'-]*)?):\s").expect("Invalid speaker label regex")
});

/// Speaker label at the start of a line. All-caps labels such as `ACTION:`
/// or `NOTE:` are markers, not people.
pub fn speaker_label(line: &str) -> Option<&str> {
    let label = SPEAKER_LABEL.captures(line)?.get(1)?.as_str();
    label.chars().any(char::is_lowercase).then_some(label)
}

pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // Explicit markers: "ACTION: ...", "- TODO - ...", "Bob: Action item: ..."
        Rule::new(
            "action_marker",
            Category::ActionItem,
            r"^\s*(?:[-*•]\s*)?(?:[A-Z][\w.'-]*(?:\s[A-Z][\w.'-]*)?:\s+)?(?i:action(?:\s+item)?|todo)\s*[:\-]\s*(.+)$",
            |caps, _| clean_clause(&caps[1]),
        ),
        // "<Name> will <verb phrase>", optionally behind a speaker label
        Rule::new(
            "owner_will",
            Category::ActionItem,
            r"^\s*(?:[-*•]\s*)?(?:(?P<speaker>[A-Z][\w.'-]*(?:\s[A-Z][\w.'-]*)?):\s+)?@?(?P<owner>[A-Za-z][\w'-]*)\s+will\s+(?P<task>.+)$",
            owner_will,
        ),
        Rule::new(
            "we_decided",
            Category::Decision,
            r"(?i)\bwe(?:'ve|\s+have)?\s+(?:finally\s+)?decided\s+(?:to\s+|that\s+|on\s+)?(.+)$",
            |caps, _| clean_clause(&caps[1]),
        ),
        Rule::new(
            "agreed",
            Category::Decision,
            r"(?i)\bagreed\s+(?:to|that|on|upon)\s+(.+)$",
            |caps, _| clean_clause(&caps[1]),
        ),
        Rule::new(
            "proceed_with",
            Category::Decision,
            r"(?i)\bwill\s+proceed\s+with\s+(.+)$",
            |caps, _| clean_clause(&caps[1]).map(|c| format!("proceed with {}", c)),
        ),
        Rule::new(
            "decided_or_approved",
            Category::Decision,
            r"(?i)\b(?:decided|approved)\b\s*(?:to\s+|that\s+|on\s+)?(.+)$",
            |caps, _| clean_clause(&caps[1]),
        ),
    ]
});

/// Rules for one category, in table order
pub fn rules_for(category: Category) -> impl Iterator<Item = &'static Rule> {
    RULES.iter().filter(move |r| r.category == category)
}

fn owner_will(caps: &Captures<'_>, context: &RuleContext<'_>) -> Option<String> {
    let task = clean_clause(caps.name("task")?.as_str())?;
    let owner = caps.name("owner")?.as_str();

    // "Bob: I will send the notes" - the speaker is the owner, even in a later
    // sentence of the same line
    if owner.eq_ignore_ascii_case("i") {
        let speaker = caps.name("speaker").map(|m| m.as_str()).or(context.speaker)?;
        return Some(format!("{}: {}", speaker, task));
    }

    let key = owner.to_lowercase();
    if NON_OWNERS.contains(&key.as_str()) || CALENDAR_WORDS.contains(&key.as_str()) {
        return None;
    }

    // Known participants are authoritative; otherwise a capitalized name will do
    let transcript = context.transcript;
    let is_owner = if transcript.participants.is_empty() {
        owner.chars().next().is_some_and(char::is_uppercase)
    } else {
        transcript.is_participant(owner)
    };

    is_owner.then(|| format!("{}: {}", owner, task))
}

/// Trim whitespace and trailing punctuation, collapse inner whitespace
pub fn clean_clause(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | ';' | ',' | ':' | '!') || c.is_whitespace())
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
