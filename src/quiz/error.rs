use thiserror::Error;

use super::Phase;

pub type Result<T> = std::result::Result<T, QuizError>;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("question bank is invalid: {0}")]
    InvalidBank(String),

    #[error("question bank I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("question bank serialization failure: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("question bank YAML serialization failure: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("option {index} is out of range for {options} option(s)")]
    OptionOutOfRange { index: usize, options: usize },

    #[error("select an option before submitting")]
    NoSelection,

    #[error("`{action}` is not allowed while {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },
}
