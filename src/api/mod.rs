//! API layer for the public chat and image editor server.
//!
//! This module contains the HTTP handlers, request/response models, public-key
//! authentication, SSE support and the router that ties them together.

pub mod auth;
pub mod chat;
pub mod editor;
pub mod handlers;
pub mod models;
pub mod streaming;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::{request_id_middleware, MetricsMiddleware};

// Re-export commonly used types
pub use auth::{check_public_key, verify_public_key};
pub use chat::{chat_completions, chat_models};
pub use editor::{editor_edit, editor_generate, editor_models};
pub use handlers::{health, metrics_handler, AppState};
pub use models::{
    ChatMessage, ChatRequest, EditorEditRequest, EditorGenerateRequest, EditorImageResponse,
    HealthResponse,
};
pub use streaming::sse_response;

/// OpenAPI documentation for the public endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        chat::chat_models,
        chat::chat_completions,
        editor::editor_models,
        editor::editor_generate,
        editor::editor_edit,
        handlers::health,
    ),
    components(
        schemas(
            models::MessageContent,
            models::ChatMessage,
            models::ChatRequest,
            models::ChatModelEntry,
            models::ChatModelList,
            models::EditorModelEntry,
            models::EditorModelList,
            models::EditorGenerateRequest,
            models::EditorEditRequest,
            models::EditorImageResponse,
            models::HealthResponse,
        )
    ),
    tags(
        (name = "chat", description = "Public text chat endpoints"),
        (name = "editor", description = "Public image generation and edit endpoints"),
        (name = "ops", description = "Health endpoints")
    ),
    info(
        title = "Grok Public API",
        version = "1.0.0",
        description = "Public chat and image editor endpoints backed by pooled upstream tokens.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://127.0.0.1:8000", description = "Local development server")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct PublicApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

/// Routes mounted under `/v1/public`.
///
/// Model listings are open; the POST routes go through [`verify_public_key`].
pub fn public_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/chat/completions", post(chat_completions))
        .route("/editor/generate", post(editor_generate))
        .route("/editor/edit", post(editor_edit))
        .route_layer(from_fn_with_state(state.clone(), verify_public_key));

    let open = Router::new()
        .route("/chat/models", get(chat_models))
        .route("/editor/models", get(editor_models));

    Router::new()
        .nest("/v1/public", protected.merge(open))
        .with_state(state)
}

/// Full application router: public routes, docs, health and metrics.
pub fn build_router(state: Arc<AppState>) -> Router {
    let swagger_ui =
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", PublicApiDoc::openapi());

    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());

    Router::new()
        .merge(public_router(state))
        .merge(swagger_ui)
        .merge(ops)
        .layer(from_fn(MetricsMiddleware::track_metrics))
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
