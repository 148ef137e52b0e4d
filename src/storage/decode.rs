use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;

/// Returns the base64 payload of an image string from the txt2img API.
///
/// A `data:<mime>;base64,` prefix is dropped, then everything from the
/// first remaining comma on is ignored.
pub fn image_payload(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    let body = match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or("", |(_, data)| data),
        None => trimmed,
    };
    body.split(',').next().unwrap_or_default().trim()
}

pub fn decode_base64_image(encoded: &str) -> Result<DynamicImage> {
    let bytes = STANDARD.decode(image_payload(encoded))?;
    Ok(image::load_from_memory(&bytes)?)
}
