//! Prompt construction
//!
//! Prompts are built by pure functions so their wording can be tested and
//! versioned independently of the orchestrator.

use crate::chat::models::Message;

/// System prompt for the main completion call
///
/// When a context summary is present it is embedded after the base
/// instruction so the model treats it as prior-conversation knowledge.
pub fn completion_system_prompt(context: Option<&str>) -> String {
    const BASE: &str = "Return all your responses for the user in the Markdown format.";

    match context {
        Some(summary) if !summary.is_empty() => format!(
            "{}\n\nThe following is a summary of the conversation so far. \
             Use it as context when answering:\n{}",
            BASE, summary
        ),
        _ => BASE.to_string(),
    }
}

/// System prompt for the summarization call
pub fn summary_system_prompt() -> String {
    "You are a concise summarizer. Compress conversations without losing \
     key decisions, facts, and open items."
        .to_string()
}

/// User prompt for the summarization call
///
/// Two variants: with no prior summary the dialogue is summarized directly;
/// with one, the model first judges relevance and drops a stale summary
/// rather than folding it in.
pub fn summary_user_prompt(prior_summary: Option<&str>, turns: &[Message]) -> String {
    let transcript = serialize_turns(turns);

    match prior_summary {
        Some(prior) if !prior.is_empty() => format!(
            "Below is a summary of an earlier conversation, followed by newer \
             dialogue turns. If the dialogue relates to the summary, produce an \
             updated summary of both in no more than 100 words. If it does not, \
             ignore the summary and summarize only the dialogue in no more than \
             100 words.\n\nSummary:\n{}\n\nDialogue:\n{}",
            prior, transcript
        ),
        _ => format!(
            "Summarize the following conversation in no more than 100 words:\n\n{}",
            transcript
        ),
    }
}

/// Serialize dialogue turns as `role: content` lines
fn serialize_turns(turns: &[Message]) -> String {
    turns
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
