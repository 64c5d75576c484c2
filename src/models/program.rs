use serde::{Deserialize, Serialize};

use super::{ExtractionResult, LabeledExample};

/// Current schema version for serialized program configurations
pub const PROGRAM_SCHEMA_VERSION: u32 = 1;

/// Baseline instructions for the learned extraction program
pub const DEFAULT_INSTRUCTIONS: &str = "Summarize the meeting transcript in 3 concise sentences focusing on key outcomes. \
Extract concrete action items; each should be a short imperative or assignment, keeping the owner's name when one is given. \
List explicit decisions or approvals made during the meeting.";

/// What a program configuration extracts. Acts as the schema tag on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    /// Summary + action items + decisions from a meeting transcript
    MeetingExtraction,
}

/// A worked example shown to the model ahead of the real transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exemplar {
    pub transcript: String,
    pub output: ExtractionResult,
}

impl Exemplar {
    pub fn from_example(example: &LabeledExample) -> Self {
        Self {
            transcript: example.transcript.text.clone(),
            output: example.gold.clone(),
        }
    }
}

/// Sampling and prompt-size knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hyperparameters {
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in the completion
    pub max_tokens: u32,
    /// Upper bound on exemplars rendered into the prompt
    pub max_exemplars: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2048,
            max_exemplars: 4,
        }
    }
}

/// Everything that determines how the learned path treats a transcript
///
/// Two configurations with the same serialized form behave identically, so
/// equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramConfiguration {
    pub kind: ProgramKind,
    pub version: u32,
    /// Instruction text placed in the system prompt
    pub instructions: String,
    /// Few-shot exemplars, rendered in order
    #[serde(default)]
    pub exemplars: Vec<Exemplar>,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

impl Default for ProgramConfiguration {
    fn default() -> Self {
        Self {
            kind: ProgramKind::MeetingExtraction,
            version: PROGRAM_SCHEMA_VERSION,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            exemplars: Vec::new(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl ProgramConfiguration {
    /// Check the configuration against the schema rules
    pub fn validate(&self) -> ProgramValidation {
        let mut errors = Vec::new();

        if self.version != PROGRAM_SCHEMA_VERSION {
            errors.push(format!(
                "Unsupported schema version {} (expected {})",
                self.version, PROGRAM_SCHEMA_VERSION
            ));
        }

        if self.instructions.trim().is_empty() {
            errors.push("Instructions must not be empty".to_string());
        }

        let temperature = self.hyperparameters.temperature;
        if !(0.0..=1.0).contains(&temperature) {
            errors.push(format!("Temperature {} is outside [0, 1]", temperature));
        }

        if self.hyperparameters.max_tokens == 0 {
            errors.push("max_tokens must be positive".to_string());
        }

        if self.exemplars.len() > self.hyperparameters.max_exemplars {
            errors.push(format!(
                "{} exemplars exceed max_exemplars {}",
                self.exemplars.len(),
                self.hyperparameters.max_exemplars
            ));
        }

        for (i, exemplar) in self.exemplars.iter().enumerate() {
            if exemplar.transcript.trim().is_empty() {
                errors.push(format!("Exemplar {} has an empty transcript", i));
            }
        }

        if errors.is_empty() {
            ProgramValidation::valid()
        } else {
            ProgramValidation::invalid(errors)
        }
    }
}

/// Validation result for a program configuration
#[derive(Debug, Clone)]
pub struct ProgramValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ProgramValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}
