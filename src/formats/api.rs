use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::model::Frame;

use super::raster::{decode_raster, gray_buffer};
use super::tiff::decode_tiff;
use super::util::extension;
use super::{FormatError, Result, dicom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Raster,
    Tiff,
    Dicom,
}

pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "dcm", "dicom",
    ]
}

pub fn format_for_extension(extension: &str) -> Option<ImageFormat> {
    match extension.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Some(ImageFormat::Raster),
        "tif" | "tiff" => Some(ImageFormat::Tiff),
        "dcm" | "dicom" => Some(ImageFormat::Dicom),
        _ => None,
    }
}

/// Identifies a payload by its leading bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if dicom::is_dicom(bytes) {
        return Some(ImageFormat::Dicom);
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return Some(ImageFormat::Tiff);
    }
    image::guess_format(bytes)
        .ok()
        .map(|_| ImageFormat::Raster)
}

pub fn decode_bytes(bytes: &[u8], source: &str) -> Result<Vec<Frame>> {
    let format = sniff_format(bytes).ok_or_else(|| {
        FormatError::UnsupportedFormat(format!("unrecognised payload from `{source}`"))
    })?;
    decode_as(format, bytes, source)
}

pub fn decode_dicom(bytes: &[u8], source: &str) -> Result<Vec<Frame>> {
    dicom::decode_dicom(bytes, source)
}

/// Reads a local file. Content sniffing wins; the extension is the fallback so that a
/// damaged file still reports a format-specific error.
pub fn read_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let source = path.display().to_string();
    let format = sniff_format(&bytes)
        .or_else(|| extension(path).as_deref().and_then(format_for_extension))
        .ok_or_else(|| {
            FormatError::UnsupportedFormat(
                extension(path).unwrap_or_else(|| path.display().to_string()),
            )
        })?;
    decode_as(format, &bytes, &source)
}

fn decode_as(format: ImageFormat, bytes: &[u8], source: &str) -> Result<Vec<Frame>> {
    match format {
        ImageFormat::Raster => Ok(vec![decode_raster(bytes, source)?]),
        ImageFormat::Tiff => decode_tiff(bytes, source),
        ImageFormat::Dicom => dicom::decode_dicom(bytes, source),
    }
}

pub fn write_gray_png(path: impl AsRef<Path>, width: usize, height: usize, pixels: &[u8]) -> Result<()> {
    gray_buffer(width, height, pixels)?.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

pub fn encode_gray_png(width: usize, height: usize, pixels: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    gray_buffer(width, height, pixels)?.write_to(&mut cursor, image::ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
