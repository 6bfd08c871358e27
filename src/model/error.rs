use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(
        "frame shape mismatch: data is {data_rows}x{data_columns} but metadata says {meta_rows}x{meta_columns}"
    )]
    ShapeMismatch {
        data_rows: usize,
        data_columns: usize,
        meta_rows: usize,
        meta_columns: usize,
    },

    #[error("frame has a zero-sized dimension ({rows}x{columns})")]
    EmptyFrame { rows: usize, columns: usize },

    #[error("invalid frame metadata: {0}")]
    InvalidMetadata(String),
}
