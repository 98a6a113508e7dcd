//! Model catalog.
//!
//! An immutable in-memory table of known models and their capability flags.
//! Routing and validation are predicates over this table.

use crate::core::config::{ModelConfig, ModelTier};
use serde::Serialize;

/// Fixed model used by the image generation endpoint.
pub const IMAGE_GENERATION_MODEL: &str = "grok-imagine-1.0";

/// Fixed model used by the image edit endpoint.
pub const IMAGE_EDIT_MODEL: &str = "grok-imagine-1.0-edit";

pub const POOL_BASIC: &str = "ssoBasic";
pub const POOL_SUPER: &str = "ssoSuper";

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub display_name: String,
    pub tier: ModelTier,
    pub is_image: bool,
    pub is_image_edit: bool,
    pub is_video: bool,
}

impl ModelInfo {
    /// A plain text chat model with no media capability flags set.
    pub fn text(model_id: &str, display_name: &str, tier: ModelTier) -> Self {
        Self {
            model_id: model_id.to_string(),
            display_name: display_name.to_string(),
            tier,
            is_image: false,
            is_image_edit: false,
            is_video: false,
        }
    }

    pub fn is_text(&self) -> bool {
        !self.is_image && !self.is_image_edit && !self.is_video
    }
}

impl From<&ModelConfig> for ModelInfo {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model_id: config.id.clone(),
            display_name: config
                .display_name
                .clone()
                .unwrap_or_else(|| config.id.clone()),
            tier: config.tier,
            is_image: config.is_image,
            is_image_edit: config.is_image_edit,
            is_video: config.is_video,
        }
    }
}

/// Read-only model catalog.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    /// The built-in model table.
    pub fn builtin() -> Self {
        let mut models = vec![
            ModelInfo::text("grok-3", "Grok 3", ModelTier::Basic),
            ModelInfo::text("grok-3-mini", "Grok 3 Mini", ModelTier::Basic),
            ModelInfo::text("grok-3-thinking", "Grok 3 Thinking", ModelTier::Basic),
            ModelInfo::text("grok-4", "Grok 4", ModelTier::Basic),
            ModelInfo::text("grok-4-mini", "Grok 4 Mini", ModelTier::Basic),
            ModelInfo::text("grok-4-thinking", "Grok 4 Thinking", ModelTier::Basic),
            ModelInfo::text("grok-4-heavy", "Grok 4 Heavy", ModelTier::Super),
            ModelInfo::text("grok-4.1", "Grok 4.1", ModelTier::Basic),
            ModelInfo::text("grok-4.1-thinking", "Grok 4.1 Thinking", ModelTier::Basic),
        ];
        models.push(ModelInfo {
            is_image: true,
            ..ModelInfo::text(IMAGE_GENERATION_MODEL, "Grok Imagine 1.0", ModelTier::Basic)
        });
        models.push(ModelInfo {
            is_image_edit: true,
            ..ModelInfo::text(IMAGE_EDIT_MODEL, "Grok Imagine 1.0 Edit", ModelTier::Basic)
        });
        models.push(ModelInfo {
            is_video: true,
            ..ModelInfo::text(
                "grok-imagine-1.0-video",
                "Grok Imagine 1.0 Video",
                ModelTier::Basic,
            )
        });
        Self::new(models)
    }

    /// Catalog from configuration, or the built-in table when none is configured.
    pub fn from_config(models: &[ModelConfig]) -> Self {
        if models.is_empty() {
            Self::builtin()
        } else {
            Self::new(models.iter().map(ModelInfo::from).collect())
        }
    }

    /// All models in catalog order.
    pub fn list(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.model_id == model_id)
    }

    pub fn text_models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(|m| m.is_text())
    }

    pub fn image_models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(|m| m.is_image)
    }

    pub fn edit_models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(|m| m.is_image_edit)
    }

    /// Token pools to try for a model, in order.
    ///
    /// Super-tier models only draw from the super pool; everything else, unknown
    /// models included, tries the basic pool first.
    pub fn pool_candidates_for_model(&self, model_id: &str) -> Vec<&'static str> {
        match self.get(model_id).map(|m| m.tier) {
            Some(ModelTier::Super) => vec![POOL_SUPER],
            _ => vec![POOL_BASIC, POOL_SUPER],
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
