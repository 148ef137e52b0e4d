pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod listener;
pub mod logger;
pub mod models;
pub mod sdapi;
pub mod storage;

pub use config::DreamerConfig;
pub use controller::{Controller, Status, TickOutcome};
pub use error::{DreamerError, Result};
pub use listener::Listener;
pub use models::*;
pub use sdapi::{ImageBackend, Txt2ImgClient};
pub use storage::ImageStore;
