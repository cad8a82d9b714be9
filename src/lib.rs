//! Streaming chat relay with token-budget context summarization
//!
//! Turns a multi-turn dialogue plus an optional prior-conversation summary
//! into a single upstream completion request and streams the answer back as
//! plain text. When the estimated token cost of the history exceeds the
//! configured budget, the history is first compressed into a short summary
//! which is handed back to the caller at the end of the stream.

pub mod api;
pub mod chat;
pub mod config;
pub mod context;
pub mod metrics;
pub mod upstream;

pub use chat::{ChatError, ChatOrchestrator, ChatRequest, Message, Role};
pub use config::RelayConfig;
pub use context::{BlendedEstimator, ContextSummarizer, TokenEstimator};
pub use upstream::{CompletionBackend, CompletionCall, OpenAiClient, UpstreamError};
