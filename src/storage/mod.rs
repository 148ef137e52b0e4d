pub mod decode;

use crate::{config::DreamerConfig, error::Result};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub use decode::decode_base64_image;

#[derive(Clone)]
enum Location {
    Directory(PathBuf),
    // Removed, with everything in it, when the last store handle drops.
    Temporary(Arc<TempDir>),
}

/// Writes PNG files under fresh random names into one directory.
#[derive(Clone)]
pub struct ImageStore {
    location: Location,
}

impl ImageStore {
    pub fn from_config(config: &DreamerConfig) -> Result<Self> {
        if config.use_temp_dir {
            Self::temporary()
        } else {
            Self::in_dir(&config.output_dir)
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            location: Location::Directory(dir),
        })
    }

    pub fn temporary() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("rdreamer-").tempdir()?;
        Ok(Self {
            location: Location::Temporary(Arc::new(dir)),
        })
    }

    pub fn dir(&self) -> &Path {
        match &self.location {
            Location::Directory(dir) => dir,
            Location::Temporary(dir) => dir.path(),
        }
    }

    pub fn save(&self, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.dir().join(format!("{}.png", Uuid::new_v4()));
        image.save_with_format(&path, ImageFormat::Png)?;
        log::info!("💾 Image saved to: {}", path.display());
        Ok(path)
    }
}
