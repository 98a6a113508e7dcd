//! Chat completion collaborator seam.

use crate::api::models::ChatMessage;
use crate::core::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Byte stream of server-sent events produced by a streaming completion.
pub type ChatStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send>>;

/// Result of a chat completion call.
pub enum ChatOutcome {
    /// A single JSON completion body.
    Completion(serde_json::Value),
    /// An event stream to forward to the client as-is.
    Stream(ChatStream),
}

impl std::fmt::Debug for ChatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatOutcome::Completion(value) => f.debug_tuple("Completion").field(value).finish(),
            ChatOutcome::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Performs chat completions against the upstream.
///
/// Token selection, protocol translation and streaming normalization are the
/// implementation's responsibility.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn completions(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        stream: bool,
    ) -> Result<ChatOutcome>;
}
