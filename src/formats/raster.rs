use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use ndarray::Array2;

use crate::model::{Frame, PixelType, WindowLevel};

use super::util::metadata_for;
use super::{FormatError, Result};

/// Decodes PNG/JPEG/GIF/BMP/WebP payloads. Colour images are reduced to luminance.
pub(crate) fn decode_raster(bytes: &[u8], source: &str) -> Result<Frame> {
    let image = image::load_from_memory(bytes)?;
    let (pixel_type, width, height, values) = match image {
        DynamicImage::ImageLuma16(buffer) => {
            let (width, height) = buffer.dimensions();
            let values = buffer.pixels().map(|pixel| f32::from(pixel.0[0])).collect();
            (PixelType::U16, width, height, values)
        }
        DynamicImage::ImageLuma8(buffer) => {
            let (width, height) = buffer.dimensions();
            let values = buffer.pixels().map(|pixel| f32::from(pixel.0[0])).collect();
            (PixelType::U8, width, height, values)
        }
        other => {
            let luma = other.to_luma8();
            let (width, height) = luma.dimensions();
            let values = luma.pixels().map(|pixel| f32::from(pixel.0[0])).collect();
            (PixelType::U8, width, height, values)
        }
    };

    let data = Array2::from_shape_vec((height as usize, width as usize), values)
        .map_err(|error| FormatError::UnsupportedLayout(error.to_string()))?;
    let mut metadata = metadata_for(height as usize, width as usize, pixel_type, source);
    if pixel_type == PixelType::U8 {
        metadata.window = Some(WindowLevel::from_range(0.0, 255.0));
    }
    Ok(Frame::new(data, metadata)?)
}

pub(crate) fn gray_buffer(width: usize, height: usize, pixels: &[u8]) -> Result<GrayImage> {
    ImageBuffer::<Luma<u8>, _>::from_vec(width as u32, height as u32, pixels.to_vec()).ok_or_else(
        || {
            FormatError::UnsupportedLayout(format!(
                "expected {} grayscale samples for {width}x{height}, found {}",
                width * height,
                pixels.len()
            ))
        },
    )
}
