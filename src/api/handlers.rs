//! Shared application state and ambient endpoints (health, metrics).

use crate::api::models::HealthResponse;
use crate::core::{AppConfig, AppError, Result};
use crate::services::{
    ChatService, ImageEditService, ImageGenerationService, ModelCatalog, TokenManager,
    UpstreamClient,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<ModelCatalog>,
    pub token_manager: Arc<dyn TokenManager>,
    pub chat_service: Arc<dyn ChatService>,
    pub image_generation: Arc<dyn ImageGenerationService>,
    pub image_edit: Arc<dyn ImageEditService>,
}

impl AppState {
    /// Wire the default upstream client behind every collaborator seam.
    pub fn new(
        config: AppConfig,
        catalog: Arc<ModelCatalog>,
        token_manager: Arc<dyn TokenManager>,
        http_client: reqwest::Client,
    ) -> Self {
        let upstream = Arc::new(UpstreamClient::new(
            http_client,
            config.upstream.base_url.clone(),
            catalog.clone(),
            token_manager.clone(),
        ));

        Self {
            config,
            catalog,
            token_manager,
            chat_service: upstream.clone(),
            image_generation: upstream.clone(),
            image_edit: upstream,
        }
    }
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "ops",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        models: state.catalog.len(),
        pools: state.token_manager.pool_sizes(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
