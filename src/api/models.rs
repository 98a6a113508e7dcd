//! API request and response models.
//!
//! This module defines all data structures used by the public API: chat requests,
//! image editor requests and responses, and model listings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Message content: plain text or structured parts passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: MessageContent,
}

/// Public chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "model": "grok-3",
    "messages": [{"role": "user", "content": "Hello!"}],
    "stream": true
}))]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Conversation messages
    pub messages: Vec<ChatMessage>,

    /// Whether to stream the response (defaults to true)
    #[serde(default)]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatModelEntry {
    pub id: String,
    pub object: String,
    pub display_name: String,
}

/// `GET /chat/models` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatModelList {
    pub object: String,
    pub data: Vec<ChatModelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EditorModelEntry {
    pub id: String,
    pub name: String,
    /// "generate" or "edit"
    #[serde(rename = "type")]
    pub kind: String,
}

/// `GET /editor/models` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EditorModelList {
    pub models: Vec<EditorModelEntry>,
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

fn default_n() -> u32 {
    1
}

/// Text-to-image request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"prompt": "a cat", "aspect_ratio": "16:9", "n": 2}))]
pub struct EditorGenerateRequest {
    /// Image description
    pub prompt: String,

    /// One of 1:1, 16:9, 9:16, 3:2, 2:3; anything else falls back to 1:1
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// Number of images, at least 1; values above 4 are clamped
    #[serde(default = "default_n")]
    pub n: u32,
}

/// Image edit request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EditorEditRequest {
    /// Edit description
    pub prompt: String,

    /// Source image as a data URI or bare base64
    pub image: String,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

/// Images produced by a generate or edit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"images": ["data:image/png;base64,AAA"], "elapsed_ms": 1834}))]
pub struct EditorImageResponse {
    pub images: Vec<String>,
    /// Milliseconds from token acquisition to response assembly
    pub elapsed_ms: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub models: usize,
    pub pools: BTreeMap<String, usize>,
}
