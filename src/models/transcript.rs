use serde::{Deserialize, Serialize};

/// A meeting transcript: the raw text plus the people who took part
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Free-text transcript - never changed by the pipeline
    pub text: String,
    /// Participant identifiers in the order they were supplied
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            participants: Vec::new(),
        }
    }

    pub fn with_participants<I, S>(text: impl Into<String>, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            participants: participants.into_iter().map(Into::into).collect(),
        }
    }

    /// Non-empty, trimmed lines in order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// Case-insensitive participant lookup
    pub fn is_participant(&self, name: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
