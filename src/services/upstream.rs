//! Default collaborator implementation backed by an OpenAI-compatible upstream.
//!
//! [`UpstreamClient`] implements [`ChatService`], [`ImageGenerationService`] and
//! [`ImageEditService`] by forwarding JSON requests with a bearer token. Non-2xx
//! answers become [`AppError::Upstream`] carrying the upstream status, and the token
//! is reported back to the [`TokenManager`].

use crate::api::models::ChatMessage;
use crate::core::error::{AppError, Result};
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::services::chat_service::{ChatOutcome, ChatService};
use crate::services::image_service::{
    EditRequest, GenerationRequest, ImageEditService, ImageGenerationService, ImageResult,
    IMAGE_ERROR_SENTINEL,
};
use crate::services::model_service::{ModelCatalog, ModelInfo};
use crate::services::token_manager::{acquire_token, TokenManager};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const IMAGE_GENERATIONS_PATH: &str = "/v1/images/generations";
const IMAGE_EDITS_PATH: &str = "/v1/images/edits";

/// HTTP client for the upstream provider.
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
    catalog: Arc<ModelCatalog>,
    token_manager: Arc<dyn TokenManager>,
}

impl UpstreamClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        catalog: Arc<ModelCatalog>,
        token_manager: Arc<dyn TokenManager>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog,
            token_manager,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `body` to `path`, returning the response only when it is a success.
    async fn post_json(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        path: &str,
        body: &Value,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    request_id = %get_request_id(),
                    url = %url,
                    operation = %operation,
                    error = %e,
                    error_source = ?e.source(),
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "HTTP request failed to upstream"
                );
                AppError::upstream(e.to_string(), None)
            })?;

        get_metrics()
            .upstream_latency
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());

        let status = response.status();
        tracing::debug!(
            request_id = %get_request_id(),
            url = %url,
            status = %status,
            operation = %operation,
            "HTTP request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = extract_error_message(&text, status.as_u16());
        token_manager.record_failure(token, status.as_u16());

        tracing::warn!(
            request_id = %get_request_id(),
            operation = %operation,
            status = status.as_u16(),
            message = %message,
            "Upstream returned an error"
        );
        Err(AppError::upstream(message, Some(status.as_u16())))
    }

    async fn images(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        path: &str,
        body: Value,
        operation: &str,
    ) -> Result<ImageResult> {
        let response = self
            .post_json(token_manager, token, path, &body, operation)
            .await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Invalid upstream response: {}", e), None))?;
        Ok(parse_image_data(&value))
    }
}

/// Pull a human-readable message out of an upstream error body.
fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("error"),
            value.get("message"),
            value.get("detail"),
        ];
        if let Some(msg) = candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
        {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Map an OpenAI-style `{"data": [...]}` body to image strings.
///
/// Each item yields its non-empty `b64_json`. URL-only or empty items become the
/// error sentinel, since only base64 payloads may be rendered as data URIs.
fn parse_image_data(value: &Value) -> ImageResult {
    let data = value
        .get("data")
        .and_then(|d| d.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("b64_json")
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.is_empty())
                        .unwrap_or(IMAGE_ERROR_SENTINEL)
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    ImageResult { data }
}

#[async_trait]
impl ChatService for UpstreamClient {
    async fn completions(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        stream: bool,
    ) -> Result<ChatOutcome> {
        let token = acquire_token(self.token_manager.as_ref(), &self.catalog, model).await?;
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });

        let response = self
            .post_json(
                self.token_manager.as_ref(),
                &token,
                CHAT_COMPLETIONS_PATH,
                &body,
                "chat",
            )
            .await?;

        if !stream {
            let value: Value = response.json().await.map_err(|e| {
                AppError::upstream(format!("Invalid upstream response: {}", e), None)
            })?;
            return Ok(ChatOutcome::Completion(value));
        }

        let byte_stream = response.bytes_stream().filter_map(|chunk_result| async move {
            match chunk_result {
                Ok(bytes) => Some(Ok::<Bytes, std::io::Error>(bytes)),
                Err(e) => {
                    tracing::error!("Stream error: {}", e);
                    None
                }
            }
        });

        Ok(ChatOutcome::Stream(Box::pin(byte_stream)))
    }
}

#[async_trait]
impl ImageGenerationService for UpstreamClient {
    async fn generate(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        model: &ModelInfo,
        request: GenerationRequest,
    ) -> Result<ImageResult> {
        let body = json!({
            "model": model.model_id,
            "prompt": request.prompt,
            "n": request.n,
            "size": request.size,
            "aspect_ratio": request.aspect_ratio,
            "response_format": request.response_format,
            "stream": request.stream,
        });
        self.images(token_manager, token, IMAGE_GENERATIONS_PATH, body, "image_generate")
            .await
    }
}

#[async_trait]
impl ImageEditService for UpstreamClient {
    async fn edit(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        model: &ModelInfo,
        request: EditRequest,
    ) -> Result<ImageResult> {
        let body = json!({
            "model": model.model_id,
            "prompt": request.prompt,
            "image": request.images,
            "n": request.n,
            "response_format": request.response_format,
            "stream": request.stream,
        });
        self.images(token_manager, token, IMAGE_EDITS_PATH, body, "image_edit")
            .await
    }
}
