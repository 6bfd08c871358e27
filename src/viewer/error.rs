use crate::engine::EngineError;
use crate::loader::LoadError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("viewer is not ready")]
    NotReady,

    #[error("viewer has been unmounted")]
    Unmounted,

    #[error("no images to display")]
    EmptyStack,

    #[error("image index {index} is out of range for {total} image(s)")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("image {index} failed to load: {source}")]
    ImageLoad {
        index: usize,
        #[source]
        source: LoadError,
    },

    #[error("unknown window/level preset `{0}`")]
    UnknownPreset(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
