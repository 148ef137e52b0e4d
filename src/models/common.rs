use serde::{Deserialize, Serialize};

/// Fixed txt2img parameters sent alongside every prompt pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub batch_size: u32,
    pub steps: u32,
    pub cfg_scale: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            batch_size: 1,
            steps: 15,
            cfg_scale: 7,
            width: 512,
            height: 768,
        }
    }
}
