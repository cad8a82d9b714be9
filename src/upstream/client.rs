//! Upstream completion client

use crate::chat::models::Message;
use crate::config::UpstreamConfig;
use crate::metrics::METRICS;
use crate::upstream::decoder::{decode_stream, DecodeError};
use crate::upstream::models::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error};

/// Upstream failure taxonomy
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream rejected the credential")]
    AuthRejected,

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("upstream error: status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("stream decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Live sequence of text fragments from a streaming completion
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// One completion request against the upstream provider
///
/// `system_prompt` becomes the single system message prepended before the
/// dialogue turns. The credential is caller-supplied per call; the relay
/// holds none of its own.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub api_key: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Completion capability, injected so tests can substitute a fake
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request a single complete response and return the first choice's text
    async fn complete(&self, call: CompletionCall) -> Result<String, UpstreamError>;

    /// Request incremental delivery and return the decoded fragment stream
    async fn complete_stream(&self, call: CompletionCall) -> Result<FragmentStream, UpstreamError>;
}

/// Production client against an OpenAI-compatible completion endpoint
pub struct OpenAiClient {
    http: Client,
    config: UpstreamConfig,
}

impl OpenAiClient {
    /// Create a new client
    ///
    /// The shared client carries a connect timeout only; the full-request
    /// timeout is applied per non-streaming call so long streamed
    /// generations are not cut off mid-delivery.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| UpstreamError::RequestFailed(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Build the request body, always prepending exactly one system message
    fn build_request(&self, call: &CompletionCall, stream: bool) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(call.messages.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: call.system_prompt.clone(),
        });
        messages.extend(call.messages.iter().map(|m| WireMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(call.max_tokens),
            n: 1,
            stream,
            temperature: Some(call.temperature),
        }
    }

    async fn send(
        &self,
        call: &CompletionCall,
        stream: bool,
    ) -> Result<reqwest::Response, UpstreamError> {
        let body = self.build_request(call, stream);

        let mut req = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&call.api_key)
            .json(&body);
        if !stream {
            req = req.timeout(self.config.timeout());
        }

        let response = req
            .send()
            .await
            .map_err(|e| UpstreamError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::AuthRejected);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, call: CompletionCall) -> Result<String, UpstreamError> {
        debug!(model = %self.config.model, turns = call.messages.len(), "non-streaming completion call");

        let response = match self.send(&call, false).await {
            Ok(response) => response,
            Err(e) => {
                METRICS.record_upstream("complete", false);
                error!("non-streaming completion failed: {}", e);
                return Err(e);
            }
        };

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        match parsed.choices.into_iter().next() {
            Some(choice) => {
                METRICS.record_upstream("complete", true);
                Ok(choice.message.content)
            }
            None => {
                METRICS.record_upstream("complete", false);
                Err(UpstreamError::InvalidResponse(
                    "no choices in response".to_string(),
                ))
            }
        }
    }

    async fn complete_stream(&self, call: CompletionCall) -> Result<FragmentStream, UpstreamError> {
        debug!(model = %self.config.model, turns = call.messages.len(), "streaming completion call");

        let response = match self.send(&call, true).await {
            Ok(response) => response,
            Err(e) => {
                METRICS.record_upstream("stream", false);
                error!("streaming completion handshake failed: {}", e);
                return Err(e);
            }
        };
        METRICS.record_upstream("stream", true);

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::RequestFailed(e.to_string())));

        Ok(Box::pin(decode_stream(bytes)))
    }
}
