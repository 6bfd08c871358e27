use crate::loader::LoadError;
use thiserror::Error;

use super::{Binding, ToolName};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("runtime module `{module}` unavailable: {reason}")]
    ModuleUnavailable { module: String, reason: String },

    #[error("imaging runtime is missing its {0} capability")]
    NotInitialized(&'static str),

    #[error("container `{0}` is disabled")]
    ContainerDisabled(String),

    #[error("container `{id}` has no drawable area ({width}x{height})")]
    InvalidContainer { id: String, width: u32, height: u32 },

    #[error("no image is displayed")]
    NoImage,

    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("tool {tool:?} cannot be bound to {binding:?}")]
    IncompatibleBinding { tool: ToolName, binding: Binding },

    #[error("loader registration failed: {0}")]
    Load(#[from] LoadError),
}
