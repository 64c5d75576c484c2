use crate::models::{ExtractionResult, ProgramConfiguration, Transcript};

use super::CompletionRequest;

/// Marks where the transcript under extraction begins in the user prompt
pub const TRANSCRIPT_HEADER: &str = "## Meeting transcript";

/// Output contract appended to every system prompt
pub const OUTPUT_CONTRACT: &str = r#"OUTPUT FORMAT:
Respond with a single JSON object and nothing else:
{
  "summary": "<3 concise sentences>",
  "action_items": ["<owner>: <task>", ...],
  "decisions": ["<decision>", ...]
}

RULES:
- Use only information present in the transcript.
- Use empty arrays when there are no action items or decisions.
- Keep each item short. Do not repeat an item."#;

/// Alternative instruction texts the optimizer may swap in
pub const INSTRUCTION_VARIANTS: &[&str] = &[
    crate::models::DEFAULT_INSTRUCTIONS,
    "Read the meeting transcript and write a short summary of what was discussed and concluded. \
Then list every task someone committed to, as \"Owner: task\" when an owner is named, \
and every decision the group reached.",
    "You extract structured notes from meetings. Produce a summary of at most three sentences, \
the action items with their owners, and the decisions or approvals. Ignore small talk.",
    "Summarize the outcomes of this meeting. Action items are commitments to do something after the meeting; \
decisions are choices the group agreed on. Report both exactly as stated.",
];

/// Extra clauses the optimizer may append to the instructions
pub const EMPHASIS_CLAUSES: &[&str] = &[
    "Prefer the speaker's own wording for each item.",
    "Only list an action item when someone clearly commits to it.",
    "Do not invent owners that are not named in the transcript.",
    "Treat approvals and agreements as decisions.",
    "Keep the summary focused on outcomes rather than discussion.",
];

/// Build the system prompt: instructions followed by the output contract
pub fn build_system_prompt(program: &ProgramConfiguration) -> String {
    format!("{}\n\n{}", program.instructions.trim(), OUTPUT_CONTRACT)
}

/// Build the user prompt: exemplars first, then the transcript under extraction
pub fn build_user_prompt(transcript: &Transcript, program: &ProgramConfiguration) -> String {
    let mut prompt = String::new();

    let limit = program.hyperparameters.max_exemplars;
    let exemplars: Vec<_> = program.exemplars.iter().take(limit).collect();
    if !exemplars.is_empty() {
        prompt.push_str("## Examples\n\n");
        for (i, exemplar) in exemplars.iter().enumerate() {
            prompt.push_str(&format!("### Example {}\n", i + 1));
            prompt.push_str("Transcript:\n");
            prompt.push_str(exemplar.transcript.trim());
            prompt.push_str("\n\nOutput:\n");
            prompt.push_str(&render_output(&exemplar.output));
            prompt.push_str("\n\n");
        }
    }

    if !transcript.participants.is_empty() {
        prompt.push_str(&format!(
            "Participants: {}\n\n",
            transcript.participants.join(", ")
        ));
    }

    prompt.push_str(TRANSCRIPT_HEADER);
    prompt.push('\n');
    prompt.push_str(transcript.text.trim());
    prompt.push('\n');

    prompt
}

/// Render the full request for one transcript under a program
pub fn build_request(transcript: &Transcript, program: &ProgramConfiguration) -> CompletionRequest {
    CompletionRequest {
        system: build_system_prompt(program),
        user: build_user_prompt(transcript, program),
        temperature: program.hyperparameters.temperature,
        max_tokens: program.hyperparameters.max_tokens,
    }
}

/// Text of the transcript section of a user prompt, if present
pub fn transcript_section(user_prompt: &str) -> Option<&str> {
    let start = user_prompt.rfind(TRANSCRIPT_HEADER)? + TRANSCRIPT_HEADER.len();
    Some(user_prompt[start..].trim())
}

fn render_output(output: &ExtractionResult) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exemplar;

    fn program_with_exemplars(n: usize) -> ProgramConfiguration {
        let mut program = ProgramConfiguration::default();
        for i in 0..n {
            program.exemplars.push(Exemplar {
                transcript: format!("Speaker {} will file the report.", i),
                output: ExtractionResult::new("Report.", [format!("Speaker {}: file the report", i)], Vec::<String>::new()),
            });
        }
        program
    }

    #[test]
    fn test_user_prompt_renders_exemplars_before_transcript() {
        let program = program_with_exemplars(2);
        let transcript = Transcript::new("Alice will send the deck.");

        let prompt = build_user_prompt(&transcript, &program);

        let first = prompt.find("### Example 1").unwrap();
        let second = prompt.find("### Example 2").unwrap();
        let header = prompt.find(TRANSCRIPT_HEADER).unwrap();
        assert!(first < second && second < header);
        assert_eq!(transcript_section(&prompt), Some("Alice will send the deck."));
    }

    #[test]
    fn test_user_prompt_respects_max_exemplars() {
        let mut program = program_with_exemplars(3);
        program.hyperparameters.max_exemplars = 1;

        let prompt = build_user_prompt(&Transcript::new("x"), &program);

        assert!(prompt.contains("### Example 1"));
        assert!(!prompt.contains("### Example 2"));
    }

    #[test]
    fn test_request_carries_hyperparameters() {
        let mut program = ProgramConfiguration::default();
        program.hyperparameters.temperature = 0.4;
        program.hyperparameters.max_tokens = 300;

        let request = build_request(&Transcript::new("We decided to ship."), &program);

        assert_eq!(request.temperature, 0.4);
        assert_eq!(request.max_tokens, 300);
        assert!(request.system.starts_with(&program.instructions));
        assert!(request.system.contains("OUTPUT FORMAT"));
    }

    #[test]
    fn test_transcript_section_missing() {
        assert!(transcript_section("no header here").is_none());
    }
}
