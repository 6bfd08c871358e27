use crate::model::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    #[error("not a DICOM part 10 stream (missing DICM marker)")]
    NotDicom,

    #[error("unsupported DICOM transfer syntax: {0}")]
    UnsupportedTransferSyntax(String),

    #[error("truncated data: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("missing required DICOM attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode/encode failure: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF decode failure: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("frame construction failure: {0}")]
    Core(#[from] CoreError),
}
