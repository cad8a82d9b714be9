//! Chat request orchestration
//!
//! Drives one request through budget check, optional history summarization,
//! and the streaming completion call:
//! `BudgetCheck -> {DirectComplete | Summarize -> ReducedComplete} -> Streaming`.

use crate::chat::models::{ChatError, ChatRequest};
use crate::chat::prompts;
use crate::config::{BudgetConfig, RelayConfig, UpstreamConfig};
use crate::context::{BlendedEstimator, ContextSummarizer, TokenEstimator};
use crate::metrics::METRICS;
use crate::upstream::{CompletionBackend, CompletionCall, FragmentStream};
use async_stream::try_stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// A running reply: the live fragment stream plus the summary produced for
/// this call, if any. When a summary was produced the stream already carries
/// the trailing context block after the last fragment.
pub struct ChatReply {
    pub stream: FragmentStream,
    pub new_context: Option<String>,
}

impl ChatReply {
    /// Label for the orchestration path taken, used in metrics
    pub fn path(&self) -> &'static str {
        if self.new_context.is_some() {
            "summarized"
        } else {
            "direct"
        }
    }
}

/// Top-level per-request state machine
pub struct ChatOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    estimator: BlendedEstimator,
    summarizer: ContextSummarizer,
    upstream: UpstreamConfig,
    budget: BudgetConfig,
}

impl ChatOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &RelayConfig) -> Self {
        Self {
            summarizer: ContextSummarizer::new(backend.clone(), &config.budget),
            backend,
            estimator: BlendedEstimator::new(),
            upstream: config.upstream.clone(),
            budget: config.budget.clone(),
        }
    }

    /// Run one chat request to the point where the reply stream is live.
    ///
    /// Errors returned here happen before any output is produced; failures
    /// after this point travel inside the stream.
    pub async fn run(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let Some(current) = request.messages.last() else {
            return Err(ChatError::Upstream("request carries no messages".to_string()));
        };

        // A single oversized turn can never fit, regardless of history;
        // reject before any upstream call.
        let turn_estimate = self.estimator.estimate(&current.content);
        if turn_estimate > self.budget.oversized_turn_tokens as f64 {
            info!(turn_estimate, "rejecting oversized current turn");
            return Err(ChatError::OversizedTurn);
        }

        let total_estimate = self
            .estimator
            .estimate_request(request.context.as_deref(), &request.messages);
        METRICS.record_estimate(total_estimate);

        let threshold = self.budget.effective_history_budget();
        debug!(total_estimate, threshold, "history budget check");

        if total_estimate <= threshold {
            self.direct_complete(request).await
        } else {
            self.summarize_then_complete(request).await
        }
    }

    /// Direct path: context and full dialogue go upstream verbatim
    async fn direct_complete(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let call = CompletionCall {
            api_key: request.api_key,
            system_prompt: prompts::completion_system_prompt(request.context.as_deref()),
            messages: request.messages,
            max_tokens: self.upstream.max_completion_tokens,
            temperature: self.upstream.temperature,
        };

        let stream = self.backend.complete_stream(call).await?;

        Ok(ChatReply {
            stream,
            new_context: None,
        })
    }

    /// Reduced path: fold every turn but the current one into a fresh
    /// summary, then complete with (summary, current turn) only. The new
    /// summary is appended to the stream as a trailing context block once
    /// the upstream stream ends cleanly, so the caller can persist it.
    async fn summarize_then_complete(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let (history, current) = request.messages.split_at(request.messages.len() - 1);

        let summary = self
            .summarizer
            .summarize(&request.api_key, request.context.as_deref(), history)
            .await?;
        METRICS.record_summarization();
        info!(folded_turns = history.len(), "history folded into new summary");

        let call = CompletionCall {
            api_key: request.api_key,
            system_prompt: prompts::completion_system_prompt(Some(&summary)),
            messages: current.to_vec(),
            max_tokens: self.upstream.max_completion_tokens,
            temperature: self.upstream.temperature,
        };

        let mut inner = self.backend.complete_stream(call).await?;

        let trailer_summary = summary.clone();
        let stream: FragmentStream = Box::pin(try_stream! {
            while let Some(fragment) = inner.next().await {
                yield fragment?;
            }
            yield context_trailer(&trailer_summary);
        });

        Ok(ChatReply {
            stream,
            new_context: Some(summary),
        })
    }
}

/// Out-of-band block carrying the new summary, appended after the last
/// fragment so the caller can persist it for the next request.
pub fn context_trailer(summary: &str) -> String {
    format!("-----Context Start-----\n{}\n-----Context End-----", summary)
}
