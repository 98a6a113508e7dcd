//! Image generation and edit collaborator seams.

use crate::core::error::Result;
use crate::services::model_service::ModelInfo;
use crate::services::token_manager::TokenManager;
use async_trait::async_trait;

/// Response format requested from the upstream for every image call.
pub const RESPONSE_FORMAT_B64: &str = "b64_json";

/// Sentinel an implementation puts in [`ImageResult::data`] for a failed item.
pub const IMAGE_ERROR_SENTINEL: &str = "error";

/// Images returned by a collaborator: bare base64, data URIs, URLs or the
/// [`IMAGE_ERROR_SENTINEL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageResult {
    pub data: Vec<String>,
}

/// Arguments for a text-to-image call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub n: u32,
    pub response_format: String,
    pub size: String,
    pub aspect_ratio: String,
    pub stream: bool,
}

/// Arguments for an image edit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub prompt: String,
    /// Source images as data URIs
    pub images: Vec<String>,
    pub n: u32,
    pub response_format: String,
    pub stream: bool,
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        model: &ModelInfo,
        request: GenerationRequest,
    ) -> Result<ImageResult>;
}

#[async_trait]
pub trait ImageEditService: Send + Sync {
    async fn edit(
        &self,
        token_manager: &dyn TokenManager,
        token: &str,
        model: &ModelInfo,
        request: EditRequest,
    ) -> Result<ImageResult>;
}
