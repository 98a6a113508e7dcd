//! Public chat endpoints.

use crate::api::handlers::AppState;
use crate::api::models::{ChatModelEntry, ChatModelList, ChatRequest};
use crate::api::streaming::sse_response;
use crate::core::{AppError, Result};
use crate::services::ChatOutcome;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// List text chat models.
#[utoipa::path(
    get,
    path = "/v1/public/chat/models",
    tag = "chat",
    responses((status = 200, description = "Text chat models", body = ChatModelList))
)]
pub async fn chat_models(State(state): State<Arc<AppState>>) -> Json<ChatModelList> {
    let data = state
        .catalog
        .text_models()
        .map(|m| ChatModelEntry {
            id: m.model_id.clone(),
            object: "model".to_string(),
            display_name: m.display_name.clone(),
        })
        .collect();

    Json(ChatModelList {
        object: "list".to_string(),
        data,
    })
}

/// Text chat completion, JSON or SSE depending on `stream`.
#[utoipa::path(
    post,
    path = "/v1/public/chat/completions",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Completion body, or an event stream when streaming"),
        (status = 400, description = "Model is not a text chat model"),
        (status = 404, description = "Model not found")
    )
)]
#[tracing::instrument(skip_all, name = "public_chat_completions")]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let stream = request.is_stream();

    let model = state
        .catalog
        .get(&request.model)
        .ok_or_else(|| AppError::ModelNotFound(request.model.clone()))?;

    if !model.is_text() {
        return Err(AppError::InvalidModel(request.model.clone()));
    }

    tracing::debug!(
        model = %request.model,
        messages = request.messages.len(),
        stream = stream,
        "Dispatching chat completion"
    );

    match state
        .chat_service
        .completions(&request.model, request.messages, stream)
        .await?
    {
        ChatOutcome::Completion(body) => Ok(Json(body).into_response()),
        ChatOutcome::Stream(events) => Ok(sse_response(events)),
    }
}
