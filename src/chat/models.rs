//! Data models for chat relaying

use crate::upstream::UpstreamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a dialogue participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single dialogue turn, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Inbound chat request
///
/// `context` is the caller-held summary of turns not present verbatim in
/// `messages`; the relay never stores it between requests. The final element
/// of `messages` is the current user turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub api_key: String,

    #[serde(default)]
    pub context: Option<String>,

    pub messages: Vec<Message>,
}

/// Caller-visible failure taxonomy for a chat request
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("current turn exceeds the single-message token budget")]
    OversizedTurn,

    #[error("upstream rejected the credential")]
    AuthRejected,

    #[error("{0}")]
    Upstream(String),
}

impl From<UpstreamError> for ChatError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::AuthRejected => ChatError::AuthRejected,
            other => ChatError::Upstream(other.to_string()),
        }
    }
}
