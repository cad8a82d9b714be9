//! Chat relaying: models, prompts, and the request state machine

pub mod models;
pub mod orchestrator;
pub mod prompts;

pub use models::{ChatError, ChatRequest, Message, Role};
pub use orchestrator::{context_trailer, ChatOrchestrator, ChatReply};
