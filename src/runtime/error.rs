use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::formats::FormatError;
use crate::loader::LoadError;
use crate::quiz::QuizError;
use crate::viewer::ViewerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("image load error: {0}")]
    Load(#[from] LoadError),

    #[error("image format error: {0}")]
    Format(#[from] FormatError),

    #[error("imaging runtime error: {0}")]
    Engine(#[from] EngineError),

    #[error("viewer error: {0}")]
    Viewer(#[from] ViewerError),

    #[error("quiz error: {0}")]
    Quiz(#[from] QuizError),

    #[error("image could not be displayed: {0}")]
    Display(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
