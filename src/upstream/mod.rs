//! Upstream completion provider boundary

pub mod client;
pub mod decoder;
pub mod models;

pub use client::{CompletionBackend, CompletionCall, FragmentStream, OpenAiClient, UpstreamError};
pub use decoder::{decode_stream, DecodeError, StreamDecoder};
