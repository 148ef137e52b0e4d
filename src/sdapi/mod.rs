pub mod txt2img_client;

use crate::{
    error::Result,
    models::{GenerationRequest, GenerationResponse},
};
use async_trait::async_trait;

pub use txt2img_client::Txt2ImgClient;

/// Anything that can turn a prompt pair into base64 images.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}
