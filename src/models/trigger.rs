use std::fmt;

pub const SHOW_IMAGE: &[u8] = b"ShowImage";
pub const SAVE_IMAGE: &[u8] = b"SaveImage";

/// A message received from the pull socket, classified by exact byte equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    ShowImage,
    SaveImage,
    Other(Vec<u8>),
}

impl Trigger {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Trigger::ShowImage => SHOW_IMAGE,
            Trigger::SaveImage => SAVE_IMAGE,
            Trigger::Other(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for Trigger {
    fn from(bytes: Vec<u8>) -> Self {
        match bytes.as_slice() {
            SHOW_IMAGE => Trigger::ShowImage,
            SAVE_IMAGE => Trigger::SaveImage,
            _ => Trigger::Other(bytes),
        }
    }
}

/// Renders the raw bytes with non-printable values escaped.
impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bytes().escape_ascii())
    }
}

/// What the listener pushes onto the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Message(Vec<u8>),
    Disconnected(String),
}
