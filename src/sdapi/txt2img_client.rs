use super::ImageBackend;
use crate::{
    config::DreamerConfig,
    error::{DreamerError, Result},
    models::{GenerationRequest, GenerationResponse},
};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Clone)]
pub struct Txt2ImgClient {
    client: Client,
    url: String,
}

impl Txt2ImgClient {
    pub fn from_config(config: &DreamerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DreamerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl ImageBackend for Txt2ImgClient {
    async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        log::info!("🎨 Requesting image from {}", self.url);
        log::debug!(
            "Prompt: {:?}, negative prompt: {:?}",
            request.prompt,
            request.negative_prompt
        );

        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DreamerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerationResponse = serde_json::from_str(&body)?;
        log::debug!("Received {} image(s)", parsed.images.len());
        Ok(parsed)
    }
}
