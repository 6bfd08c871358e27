mod api;
mod dicom;
mod error;
mod raster;
mod tiff;
mod util;

#[cfg(test)]
mod tests;

pub use api::{
    ImageFormat, decode_bytes, decode_dicom, encode_gray_png, format_for_extension, read_frames,
    sniff_format, supported_extensions, write_gray_png,
};
pub use error::{FormatError, Result};
