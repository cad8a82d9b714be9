//! LLM-based compression of prior dialogue into a context summary

use crate::chat::models::Message;
use crate::chat::prompts;
use crate::config::BudgetConfig;
use crate::upstream::{CompletionBackend, CompletionCall, UpstreamError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Compresses prior dialogue turns (plus an optional existing summary) into
/// a fresh summary bounded to ~100 words by instruction.
///
/// Uses the backend's non-streaming mode with a tight token ceiling and zero
/// temperature. A produced summary replaces the caller's previous one
/// wholesale; nothing is merged in place.
pub struct ContextSummarizer {
    backend: Arc<dyn CompletionBackend>,
    max_tokens: u32,
    temperature: f32,
}

impl ContextSummarizer {
    pub fn new(backend: Arc<dyn CompletionBackend>, budget: &BudgetConfig) -> Self {
        Self {
            backend,
            max_tokens: budget.summary_max_tokens,
            temperature: budget.summary_temperature,
        }
    }

    /// Summarize `turns` (the dialogue excluding the current turn),
    /// incorporating `prior_summary` when the model judges it relevant.
    pub async fn summarize(
        &self,
        api_key: &str,
        prior_summary: Option<&str>,
        turns: &[Message],
    ) -> Result<String, UpstreamError> {
        debug!(
            turns = turns.len(),
            has_prior = prior_summary.is_some(),
            "summarizing dialogue history"
        );

        let call = CompletionCall {
            api_key: api_key.to_string(),
            system_prompt: prompts::summary_system_prompt(),
            messages: vec![Message::user(prompts::summary_user_prompt(
                prior_summary,
                turns,
            ))],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let summary = self.backend.complete(call).await.map_err(|e| {
            warn!("summarization failed: {}", e);
            e
        })?;

        Ok(summary.trim().to_string())
    }
}
