//! Integration tests for the public API server.
//!
//! These tests drive the full router with fake collaborators and verify:
//! - Chat model listing and completion dispatch (JSON and SSE)
//! - Image editor validation, normalization and error mapping
//! - Token acquisition failures
//! - Public key authentication

mod common;

use axum::http::{header, StatusCode};
use common::{
    body_json, get, post_json, CountingTokenManager, FakeImages, ImageBehavior, TestAppBuilder,
};
use grok_public_api::{
    core::config::ModelTier,
    services::{ModelCatalog, ModelInfo, NO_TOKEN_MESSAGE},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_models_lists_only_text_models() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(get("/v1/public/chat/models"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"grok-3"));
    assert!(ids.contains(&"grok-4-heavy"));
    assert!(!ids.iter().any(|id| id.starts_with("grok-imagine")));
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["object"] == "model"));
}

#[tokio::test]
async fn test_chat_completion_non_streaming() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/chat/completions",
            json!({
                "model": "grok-3",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "grok-3");
    assert_eq!(
        app.chat.calls.lock().unwrap().as_slice(),
        &[("grok-3".to_string(), 1, false)]
    );
}

#[tokio::test]
async fn test_chat_completion_streams_by_default() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/chat/completions",
            json!({
                "model": "grok-4",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": [{"type": "text", "text": "hi"}]}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/event-stream");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
    assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("data: "));
    assert!(text.ends_with("data: [DONE]\n\n"));
    assert_eq!(
        app.chat.calls.lock().unwrap().as_slice(),
        &[("grok-4".to_string(), 2, true)]
    );
}

#[tokio::test]
async fn test_chat_unknown_model_is_not_found() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/chat/completions",
            json!({"model": "gpt-4", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "model_not_found");
    assert_eq!(body["error"]["message"], "Model 'gpt-4' not found");
    assert!(app.chat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_rejects_image_model() {
    let app = TestAppBuilder::new().build();

    for model in ["grok-imagine-1.0", "grok-imagine-1.0-edit", "grok-imagine-1.0-video"] {
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/v1/public/chat/completions",
                json!({"model": model, "messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "invalid_model");
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }
    assert!(app.chat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_malformed_body_is_bad_request() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/chat/completions",
            json!({"messages": "not a list"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

// ============================================================================
// Editor: listing and generation
// ============================================================================

#[tokio::test]
async fn test_editor_models_lists_generate_then_edit() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(get("/v1/public/editor/models"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"models": [
            {"id": "grok-imagine-1.0", "name": "grok-imagine-1.0", "type": "generate"},
            {"id": "grok-imagine-1.0-edit", "name": "grok-imagine-1.0-edit", "type": "edit"}
        ]})
    );
}

#[tokio::test]
async fn test_generate_returns_data_uris() {
    let app = TestAppBuilder::new()
        .images(FakeImages::returning(&["AAA", "data:image/png;base64,BBB"]))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/generate",
            json!({"prompt": "a red fox", "aspect_ratio": "16:9", "n": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["images"],
        json!(["data:image/png;base64,AAA", "data:image/png;base64,BBB"])
    );
    assert!(body["elapsed_ms"].is_u64());

    let calls = app.images.generations.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "a red fox");
    assert_eq!(calls[0].size, "1280x720");
    assert_eq!(calls[0].aspect_ratio, "16:9");
    assert_eq!(calls[0].n, 2);
    assert_eq!(calls[0].response_format, "b64_json");
    assert!(!calls[0].stream);
    assert_eq!(
        app.images.models.lock().unwrap().as_slice(),
        &["grok-imagine-1.0".to_string()]
    );
}

#[tokio::test]
async fn test_generate_unknown_ratio_falls_back_to_square() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/generate",
            json!({"prompt": "x", "aspect_ratio": "4:3"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = app.images.generations.lock().unwrap();
    assert_eq!(calls[0].aspect_ratio, "1:1");
    assert_eq!(calls[0].size, "1024x1024");
    assert_eq!(calls[0].n, 1);
}

#[tokio::test]
async fn test_generate_clamps_n_to_four() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/generate",
            json!({"prompt": "x", "n": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.images.generations.lock().unwrap()[0].n, 4);
}

#[tokio::test]
async fn test_generate_rejects_zero_n() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/generate",
            json!({"prompt": "x", "n": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "n must be at least 1");
    assert_eq!(app.tokens.lookups(), 0);
}

#[tokio::test]
async fn test_generate_empty_prompt_rejected_before_token_acquisition() {
    let app = TestAppBuilder::new().build();

    for prompt in ["", "   \n\t"] {
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/v1/public/editor/generate",
                json!({"prompt": prompt}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "Prompt cannot be empty");
    }

    assert_eq!(app.tokens.lookups(), 0);
    assert_eq!(app.images.calls(), 0);
}

#[tokio::test]
async fn test_generate_empty_result_is_bad_gateway() {
    let app = TestAppBuilder::new()
        .images(FakeImages::returning(&["error", ""]))
        .build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["detail"],
        "Image generation returned an empty result, please retry"
    );
}

#[tokio::test]
async fn test_generate_drops_failed_items() {
    let app = TestAppBuilder::new()
        .images(FakeImages::returning(&["AAA", "error", "CCC"]))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/generate",
            json!({"prompt": "x", "n": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["images"],
        json!(["data:image/png;base64,AAA", "data:image/png;base64,CCC"])
    );
}

#[tokio::test]
async fn test_generate_upstream_error_is_wrapped() {
    let app = TestAppBuilder::new()
        .images(FakeImages::new(ImageBehavior::UpstreamError {
            message: "quota exceeded".to_string(),
            status: Some(403),
        }))
        .build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["detail"],
        "Upstream service error: quota exceeded"
    );
}

#[tokio::test]
async fn test_generate_service_error_keeps_status() {
    let app = TestAppBuilder::new()
        .images(FakeImages::new(ImageBehavior::ServiceError {
            status: Some(503),
            message: "generator busy".to_string(),
        }))
        .build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["detail"], "generator busy");
}

#[tokio::test]
async fn test_generate_without_image_model_is_server_error() {
    let catalog = ModelCatalog::new(vec![ModelInfo::text("grok-3", "Grok 3", ModelTier::Basic)]);
    let app = TestAppBuilder::new().catalog(catalog).build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["detail"],
        "Image generation model not available"
    );
    assert_eq!(app.tokens.lookups(), 0);
}

// ============================================================================
// Editor: edit
// ============================================================================

#[tokio::test]
async fn test_edit_prefixes_bare_base64_input() {
    let app = TestAppBuilder::new()
        .images(FakeImages::returning(&["EDITED"]))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "make it blue", "image": "SRC", "aspect_ratio": "9:16"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["images"],
        json!(["data:image/png;base64,EDITED"])
    );

    let edits = app.images.edits.lock().unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].images, vec!["data:image/png;base64,SRC".to_string()]);
    assert_eq!(edits[0].n, 1);
    assert_eq!(edits[0].response_format, "b64_json");
    assert_eq!(
        app.images.models.lock().unwrap().as_slice(),
        &["grok-imagine-1.0-edit".to_string()]
    );
}

#[tokio::test]
async fn test_edit_keeps_existing_data_uri() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": "data:image/jpeg;base64,SRC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.images.edits.lock().unwrap()[0].images,
        vec!["data:image/jpeg;base64,SRC".to_string()]
    );
}

#[tokio::test]
async fn test_edit_requires_prompt_and_image() {
    let app = TestAppBuilder::new().build();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": " ", "image": "SRC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Prompt cannot be empty");

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Image data is required");

    assert_eq!(app.tokens.lookups(), 0);
    assert_eq!(app.images.calls(), 0);
}

#[tokio::test]
async fn test_edit_upload_forbidden_hint() {
    let app = TestAppBuilder::new()
        .images(FakeImages::new(ImageBehavior::UpstreamError {
            message: "Forbidden".to_string(),
            status: Some(403),
        }))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": "SRC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.contains("403"));
    assert!(detail.contains("upload permission"));
}

#[tokio::test]
async fn test_edit_other_upstream_error() {
    let app = TestAppBuilder::new()
        .images(FakeImages::new(ImageBehavior::UpstreamError {
            message: "connection reset".to_string(),
            status: None,
        }))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": "SRC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["detail"],
        "Upstream service error: connection reset"
    );
}

#[tokio::test]
async fn test_edit_empty_result_is_bad_gateway() {
    let app = TestAppBuilder::new()
        .images(FakeImages::returning(&[]))
        .build();

    let response = app
        .router
        .oneshot(post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": "SRC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["detail"],
        "Image edit returned an empty result, please retry"
    );
}

// ============================================================================
// Token acquisition
// ============================================================================

#[tokio::test]
async fn test_no_token_is_too_many_requests() {
    let app = TestAppBuilder::new()
        .tokens(CountingTokenManager::empty())
        .build();

    let requests = [
        post_json("/v1/public/editor/generate", json!({"prompt": "x"})),
        post_json(
            "/v1/public/editor/edit",
            json!({"prompt": "x", "image": "SRC"}),
        ),
    ];
    for request in requests {
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["detail"], NO_TOKEN_MESSAGE);
    }

    // Basic-tier image models try both pools
    assert_eq!(app.tokens.lookups(), 4);
    assert_eq!(app.images.calls(), 0);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_public_key_required_when_configured() {
    let app = TestAppBuilder::new().public(true, Some("pk-secret")).build();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "invalid_api_key");

    let mut request = post_json("/v1/public/editor/generate", json!({"prompt": "x"}));
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = post_json("/v1/public/editor/generate", json!({"prompt": "x"}));
    request
        .headers_mut()
        .insert("authorization", "Bearer pk-secret".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut request = post_json(
        "/v1/public/chat/completions",
        json!({"model": "grok-3", "messages": [], "stream": false}),
    );
    request
        .headers_mut()
        .insert("x-api-key", "pk-secret".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_runs_before_validation() {
    let app = TestAppBuilder::new().public(true, Some("pk-secret")).build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.tokens.lookups(), 0);
}

#[tokio::test]
async fn test_listings_are_open_with_key_configured() {
    let app = TestAppBuilder::new().public(true, Some("pk-secret")).build();

    for uri in ["/v1/public/chat/models", "/v1/public/editor/models"] {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_disabled_public_api_is_forbidden() {
    let app = TestAppBuilder::new().public(false, None).build();

    let response = app
        .router
        .oneshot(post_json("/v1/public/editor/generate", json!({"prompt": "x"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"]["message"],
        "Public API is disabled"
    );
}

// ============================================================================
// Ambient endpoints and middleware
// ============================================================================

#[tokio::test]
async fn test_health_reports_catalog_and_pools() {
    let app = TestAppBuilder::new().build();

    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"], ModelCatalog::builtin().len());
    assert_eq!(body["pools"]["ssoBasic"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestAppBuilder::new().build();

    let response = app.router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestAppBuilder::new().build();

    let mut request = get("/v1/public/chat/models");
    request
        .headers_mut()
        .insert("x-request-id", "req-abc".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc");

    let response = app
        .router
        .oneshot(get("/v1/public/chat/models"))
        .await
        .unwrap();
    assert!(response.headers().get("x-request-id").is_some());
}
