use thiserror::Error;

#[derive(Debug, Error)]
pub enum DreamerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response error: {0}")]
    Response(String),

    #[error("Response contained no images")]
    EmptyResponse,

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No image has been generated yet")]
    NoImage,

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("GUI error: {0}")]
    Gui(String),
}

impl From<reqwest::Error> for DreamerError {
    fn from(err: reqwest::Error) -> Self {
        DreamerError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for DreamerError {
    fn from(err: serde_json::Error) -> Self {
        DreamerError::Response(err.to_string())
    }
}

impl From<zeromq::ZmqError> for DreamerError {
    fn from(err: zeromq::ZmqError) -> Self {
        DreamerError::Socket(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DreamerError>;
