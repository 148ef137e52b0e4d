use super::GenerationSettings;
use serde::{Deserialize, Serialize};

/// Body of `POST /sdapi/v1/txt2img`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    #[serde(flatten)]
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, negative_prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    pub images: Vec<String>, // Base64 encoded
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub info: serde_json::Value,
}

impl GenerationResponse {
    /// Only the first image is ever shown; the rest of the batch is dropped.
    pub fn into_first_image(self) -> Option<String> {
        self.images.into_iter().next()
    }
}
