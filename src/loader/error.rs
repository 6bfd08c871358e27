use crate::formats::FormatError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid image identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("no image loader registered for scheme `{0}`")]
    UnknownScheme(String),

    #[error("a loader is already registered for scheme `{0}`")]
    DuplicateScheme(String),

    #[error("request for `{url}` failed: {message}")]
    Http { url: String, message: String },

    #[error("response for `{url}` exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("frame {index} requested but `{id}` holds {frames} frame(s)")]
    FrameOutOfRange {
        id: String,
        index: usize,
        frames: usize,
    },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode failure: {0}")]
    Format(#[from] FormatError),
}
