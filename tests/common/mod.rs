//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use bytes::Bytes;
use futures::stream;
use grok_public_api::{
    api::{ChatMessage, AppState},
    build_router,
    core::{config::PublicConfig, init_metrics, AppConfig, AppError, Result},
    services::{
        ChatOutcome, ChatService, EditRequest, GenerationRequest, ImageEditService,
        ImageGenerationService, ImageResult, ModelCatalog, ModelInfo, TokenManager,
    },
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Token manager that hands out a fixed token and counts lookups.
#[derive(Default)]
pub struct CountingTokenManager {
    pub token: Option<String>,
    pub lookups: AtomicUsize,
    pub failures: Mutex<Vec<(String, u16)>>,
}

impl CountingTokenManager {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenManager for CountingTokenManager {
    async fn reload_if_stale(&self) -> Result<()> {
        Ok(())
    }

    fn get_token(&self, _pool: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.token.clone()
    }

    fn record_failure(&self, token: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .push((token.to_string(), status));
    }

    fn pool_sizes(&self) -> BTreeMap<String, usize> {
        let mut sizes = BTreeMap::new();
        sizes.insert("ssoBasic".to_string(), usize::from(self.token.is_some()));
        sizes
    }
}

/// Chat fake returning a canned completion or a two-event stream.
#[derive(Default)]
pub struct FakeChat {
    pub calls: Mutex<Vec<(String, usize, bool)>>,
}

#[async_trait]
impl ChatService for FakeChat {
    async fn completions(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        stream: bool,
    ) -> Result<ChatOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), messages.len(), stream));

        if stream {
            let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(
                    b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n",
                )),
                Ok(Bytes::from_static(b"data: [DONE]\n\n")),
            ];
            Ok(ChatOutcome::Stream(Box::pin(stream::iter(chunks))))
        } else {
            Ok(ChatOutcome::Completion(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": model,
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}]
            })))
        }
    }
}

/// What a fake image collaborator answers with.
#[derive(Clone)]
pub enum ImageBehavior {
    Images(Vec<String>),
    UpstreamError { message: String, status: Option<u16> },
    ServiceError { status: Option<u16>, message: String },
}

impl ImageBehavior {
    fn answer(&self) -> Result<ImageResult> {
        match self {
            ImageBehavior::Images(data) => Ok(ImageResult { data: data.clone() }),
            ImageBehavior::UpstreamError { message, status } => {
                Err(AppError::upstream(message.clone(), *status))
            }
            ImageBehavior::ServiceError { status, message } => Err(AppError::Service {
                status: status.and_then(|s| axum::http::StatusCode::from_u16(s).ok()),
                code: "service_error".to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// Image fake that records every request it receives.
pub struct FakeImages {
    pub behavior: ImageBehavior,
    pub generations: Mutex<Vec<GenerationRequest>>,
    pub edits: Mutex<Vec<EditRequest>>,
    pub models: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn new(behavior: ImageBehavior) -> Self {
        Self {
            behavior,
            generations: Mutex::new(vec![]),
            edits: Mutex::new(vec![]),
            models: Mutex::new(vec![]),
        }
    }

    pub fn returning(images: &[&str]) -> Self {
        Self::new(ImageBehavior::Images(
            images.iter().map(|s| s.to_string()).collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.generations.lock().unwrap().len() + self.edits.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerationService for FakeImages {
    async fn generate(
        &self,
        _token_manager: &dyn TokenManager,
        _token: &str,
        model: &ModelInfo,
        request: GenerationRequest,
    ) -> Result<ImageResult> {
        self.models.lock().unwrap().push(model.model_id.clone());
        self.generations.lock().unwrap().push(request);
        self.behavior.answer()
    }
}

#[async_trait]
impl ImageEditService for FakeImages {
    async fn edit(
        &self,
        _token_manager: &dyn TokenManager,
        _token: &str,
        model: &ModelInfo,
        request: EditRequest,
    ) -> Result<ImageResult> {
        self.models.lock().unwrap().push(model.model_id.clone());
        self.edits.lock().unwrap().push(request);
        self.behavior.answer()
    }
}

/// Handles to the fakes behind a test router.
pub struct TestApp {
    pub router: Router,
    pub tokens: Arc<CountingTokenManager>,
    pub chat: Arc<FakeChat>,
    pub images: Arc<FakeImages>,
}

pub struct TestAppBuilder {
    config: AppConfig,
    catalog: ModelCatalog,
    tokens: CountingTokenManager,
    images: FakeImages,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            catalog: ModelCatalog::builtin(),
            tokens: CountingTokenManager::with_token("tok-basic-1"),
            images: FakeImages::returning(&["AAA"]),
        }
    }

    pub fn public(mut self, enabled: bool, key: Option<&str>) -> Self {
        self.config.public = PublicConfig {
            enabled,
            key: key.map(|k| k.to_string()),
        };
        self
    }

    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn tokens(mut self, tokens: CountingTokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn images(mut self, images: FakeImages) -> Self {
        self.images = images;
        self
    }

    pub fn build(self) -> TestApp {
        init_metrics();

        let tokens = Arc::new(self.tokens);
        let chat = Arc::new(FakeChat::default());
        let images = Arc::new(self.images);

        let state = Arc::new(AppState {
            config: self.config,
            catalog: Arc::new(self.catalog),
            token_manager: tokens.clone(),
            chat_service: chat.clone(),
            image_generation: images.clone(),
            image_edit: images.clone(),
        });

        TestApp {
            router: build_router(state),
            tokens,
            chat,
            images,
        }
    }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
