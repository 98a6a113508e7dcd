//! Public image editor endpoints: text-to-image and image edit.
//!
//! Both dispatches share the same shape: validate, resolve the fixed model, acquire a
//! token, call the collaborator once, normalize the returned images. `elapsed_ms` is
//! measured from right after token acquisition to response assembly on both paths.

use crate::api::handlers::AppState;
use crate::api::models::{
    EditorEditRequest, EditorGenerateRequest, EditorImageResponse, EditorModelEntry,
    EditorModelList,
};
use crate::core::metrics::get_metrics;
use crate::core::{AppError, Result};
use crate::services::image_service::{IMAGE_ERROR_SENTINEL, RESPONSE_FORMAT_B64};
use crate::services::{
    acquire_token, EditRequest, GenerationRequest, IMAGE_EDIT_MODEL, IMAGE_GENERATION_MODEL,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::time::Instant;

/// Supported aspect ratios and their pixel sizes.
pub const ASPECT_RATIO_SIZES: [(&str, &str); 5] = [
    ("1:1", "1024x1024"),
    ("16:9", "1280x720"),
    ("9:16", "720x1280"),
    ("3:2", "1792x1024"),
    ("2:3", "1024x1792"),
];

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_SIZE: &str = "1024x1024";

/// Upper bound on images per generate call.
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;

const DATA_URI_PNG_PREFIX: &str = "data:image/png;base64,";

pub const EDIT_UPLOAD_FORBIDDEN_MESSAGE: &str = "Image upload rejected by upstream (403): the token may lack upload permission or has expired, please check the token configuration";
pub const GENERATE_EMPTY_MESSAGE: &str = "Image generation returned an empty result, please retry";
pub const EDIT_EMPTY_MESSAGE: &str = "Image edit returned an empty result, please retry";

/// Supported ratio for `raw`, falling back to 1:1 for anything unknown.
pub fn normalize_ratio(raw: &str) -> &'static str {
    let ratio = raw.trim();
    ASPECT_RATIO_SIZES
        .iter()
        .find(|(r, _)| *r == ratio)
        .map(|(r, _)| *r)
        .unwrap_or(DEFAULT_ASPECT_RATIO)
}

/// Pixel size for a ratio; 1024x1024 when unmapped.
pub fn ratio_to_size(ratio: &str) -> &'static str {
    ASPECT_RATIO_SIZES
        .iter()
        .find(|(r, _)| *r == ratio)
        .map(|(_, s)| *s)
        .unwrap_or(DEFAULT_SIZE)
}

/// Ratio for a pixel size, if the size is in the table.
pub fn size_to_ratio(size: &str) -> Option<&'static str> {
    ASPECT_RATIO_SIZES
        .iter()
        .find(|(_, s)| *s == size)
        .map(|(r, _)| *r)
}

/// Prefix bare base64 with a PNG data URI header; `data:` strings pass through.
pub fn to_data_uri(image: &str) -> String {
    if image.starts_with("data:") {
        image.to_string()
    } else {
        format!("{}{}", DATA_URI_PNG_PREFIX, image)
    }
}

/// Drop empty and sentinel entries and render the rest as data URIs.
pub fn normalize_images(data: Vec<String>) -> Vec<String> {
    data.into_iter()
        .filter(|img| !img.is_empty() && img != IMAGE_ERROR_SENTINEL)
        .map(|img| to_data_uri(&img))
        .collect()
}

/// Convert a collaborator error into the editor's `{"detail": ...}` form.
///
/// With `upload_hint`, an upstream 403 becomes the upload-permission message.
fn translate_error(err: AppError, upload_hint: bool) -> AppError {
    match err {
        AppError::Upstream {
            status: Some(403), ..
        } if upload_hint => {
            tracing::warn!("Image edit upload 403: token may lack upload permission");
            AppError::http(StatusCode::BAD_GATEWAY, EDIT_UPLOAD_FORBIDDEN_MESSAGE)
        }
        AppError::Upstream { message, .. } => AppError::http(
            StatusCode::BAD_GATEWAY,
            format!("Upstream service error: {}", message),
        ),
        AppError::Service {
            status, message, ..
        } => AppError::http(
            status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message,
        ),
        other => other,
    }
}

fn validated_prompt(prompt: &str) -> Result<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::http(
            StatusCode::BAD_REQUEST,
            "Prompt cannot be empty",
        ));
    }
    Ok(prompt.to_string())
}

fn record_outcome(endpoint: &str, outcome: &str) {
    get_metrics()
        .image_requests
        .with_label_values(&[endpoint, outcome])
        .inc();
}

/// List image generation and edit models.
#[utoipa::path(
    get,
    path = "/v1/public/editor/models",
    tag = "editor",
    responses((status = 200, description = "Generate models first, then edit models", body = EditorModelList))
)]
pub async fn editor_models(State(state): State<Arc<AppState>>) -> Json<EditorModelList> {
    let generate = state.catalog.image_models().map(|m| EditorModelEntry {
        id: m.model_id.clone(),
        name: m.model_id.clone(),
        kind: "generate".to_string(),
    });
    let edit = state.catalog.edit_models().map(|m| EditorModelEntry {
        id: m.model_id.clone(),
        name: m.model_id.clone(),
        kind: "edit".to_string(),
    });

    Json(EditorModelList {
        models: generate.chain(edit).collect(),
    })
}

/// Text-to-image.
#[utoipa::path(
    post,
    path = "/v1/public/editor/generate",
    tag = "editor",
    request_body = EditorGenerateRequest,
    responses(
        (status = 200, description = "Generated images", body = EditorImageResponse),
        (status = 400, description = "Empty prompt or invalid n"),
        (status = 429, description = "No available token"),
        (status = 500, description = "Generation model not available"),
        (status = 502, description = "Upstream failure or empty result")
    )
)]
#[tracing::instrument(skip_all, name = "editor_generate")]
pub async fn editor_generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<EditorGenerateRequest>, JsonRejection>,
) -> Result<Json<EditorImageResponse>> {
    let Json(request) = payload?;
    let prompt = validated_prompt(&request.prompt)?;
    if request.n == 0 {
        return Err(AppError::http(
            StatusCode::BAD_REQUEST,
            "n must be at least 1",
        ));
    }

    let ratio = normalize_ratio(&request.aspect_ratio);
    let size = ratio_to_size(ratio);

    let model = state
        .catalog
        .get(IMAGE_GENERATION_MODEL)
        .filter(|m| m.is_image)
        .ok_or_else(|| {
            AppError::http(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Image generation model not available",
            )
        })?;

    let token = acquire_token(
        state.token_manager.as_ref(),
        &state.catalog,
        &model.model_id,
    )
    .await?;
    let started = Instant::now();

    let n = request.n.min(MAX_IMAGES_PER_REQUEST);
    tracing::debug!(ratio = %ratio, size = %size, n = n, "Dispatching image generation");

    let result = state
        .image_generation
        .generate(
            state.token_manager.as_ref(),
            &token,
            model,
            GenerationRequest {
                prompt,
                n,
                response_format: RESPONSE_FORMAT_B64.to_string(),
                size: size.to_string(),
                aspect_ratio: ratio.to_string(),
                stream: false,
            },
        )
        .await
        .map_err(|e| {
            record_outcome("generate", "error");
            translate_error(e, false)
        })?;

    let images = normalize_images(result.data);
    if images.is_empty() {
        record_outcome("generate", "empty");
        return Err(AppError::http(StatusCode::BAD_GATEWAY, GENERATE_EMPTY_MESSAGE));
    }

    record_outcome("generate", "success");
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(images = images.len(), elapsed_ms = elapsed_ms, "Image generation completed");

    Ok(Json(EditorImageResponse { images, elapsed_ms }))
}

/// Image-to-image / iterative edit.
#[utoipa::path(
    post,
    path = "/v1/public/editor/edit",
    tag = "editor",
    request_body = EditorEditRequest,
    responses(
        (status = 200, description = "Edited image", body = EditorImageResponse),
        (status = 400, description = "Empty prompt or image"),
        (status = 429, description = "No available token"),
        (status = 500, description = "Edit model not available"),
        (status = 502, description = "Upstream failure, upload rejection or empty result")
    )
)]
#[tracing::instrument(skip_all, name = "editor_edit")]
pub async fn editor_edit(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<EditorEditRequest>, JsonRejection>,
) -> Result<Json<EditorImageResponse>> {
    let Json(request) = payload?;
    let prompt = validated_prompt(&request.prompt)?;

    let image = request.image.trim();
    if image.is_empty() {
        return Err(AppError::http(
            StatusCode::BAD_REQUEST,
            "Image data is required",
        ));
    }
    let image = to_data_uri(image);

    // The edit contract takes no ratio; it is normalized for logging only
    let ratio = normalize_ratio(&request.aspect_ratio);

    let model = state
        .catalog
        .get(IMAGE_EDIT_MODEL)
        .filter(|m| m.is_image_edit)
        .ok_or_else(|| {
            AppError::http(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Image edit model not available",
            )
        })?;

    let token = acquire_token(
        state.token_manager.as_ref(),
        &state.catalog,
        &model.model_id,
    )
    .await?;
    let started = Instant::now();

    tracing::debug!(ratio = %ratio, image_len = image.len(), "Dispatching image edit");

    let result = state
        .image_edit
        .edit(
            state.token_manager.as_ref(),
            &token,
            model,
            EditRequest {
                prompt,
                images: vec![image],
                n: 1,
                response_format: RESPONSE_FORMAT_B64.to_string(),
                stream: false,
            },
        )
        .await
        .map_err(|e| {
            record_outcome("edit", "error");
            translate_error(e, true)
        })?;

    let images = normalize_images(result.data);
    if images.is_empty() {
        record_outcome("edit", "empty");
        return Err(AppError::http(StatusCode::BAD_GATEWAY, EDIT_EMPTY_MESSAGE));
    }

    record_outcome("edit", "success");
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(images = images.len(), elapsed_ms = elapsed_ms, "Image edit completed");

    Ok(Json(EditorImageResponse { images, elapsed_ms }))
}
