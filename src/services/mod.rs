//! Collaborator services behind the public API handlers.
//!
//! The handlers only see the traits declared here; [`UpstreamClient`] and
//! [`PoolTokenManager`] are the default implementations wired up by the binary.

pub mod chat_service;
pub mod image_service;
pub mod model_service;
pub mod token_manager;
pub mod upstream;

// Re-export commonly used types
pub use chat_service::{ChatOutcome, ChatService, ChatStream};
pub use image_service::{
    EditRequest, GenerationRequest, ImageEditService, ImageGenerationService, ImageResult,
};
pub use model_service::{ModelCatalog, ModelInfo, IMAGE_EDIT_MODEL, IMAGE_GENERATION_MODEL};
pub use token_manager::{acquire_token, PoolTokenManager, TokenManager, NO_TOKEN_MESSAGE};
pub use upstream::UpstreamClient;
