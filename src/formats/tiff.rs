use std::io::Cursor;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use crate::model::{Frame, PixelType};

use super::util::metadata_for;
use super::{FormatError, Result};

/// Decodes every page of a grayscale TIFF into its own frame.
pub(crate) fn decode_tiff(bytes: &[u8], source: &str) -> Result<Vec<Frame>> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let mut frames = Vec::new();

    loop {
        let (width, height) = decoder.dimensions()?;
        let (pixel_type, values) = decode_page(&mut decoder, width, height)?;
        let data = Array2::from_shape_vec((height as usize, width as usize), values)
            .map_err(|error| FormatError::UnsupportedLayout(error.to_string()))?;
        let metadata = metadata_for(height as usize, width as usize, pixel_type, source);
        frames.push(Frame::new(data, metadata)?);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    Ok(frames)
}

fn decode_page(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    width: u32,
    height: u32,
) -> Result<(PixelType, Vec<f32>)> {
    let (pixel_type, values) = match decoder.read_image()? {
        DecodingResult::U8(buffer) => (
            PixelType::U8,
            buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
        ),
        DecodingResult::U16(buffer) => (
            PixelType::U16,
            buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
        ),
        DecodingResult::I16(buffer) => (
            PixelType::I16,
            buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
        ),
        DecodingResult::F32(buffer) => (PixelType::F32, buffer),
        _ => {
            return Err(FormatError::UnsupportedLayout(
                "TIFF samples must be u8, u16, i16 or f32".into(),
            ));
        }
    };
    if values.len() != width as usize * height as usize {
        return Err(FormatError::UnsupportedLayout(
            "TIFF pages with more than one sample per pixel are not supported".into(),
        ));
    }
    Ok((pixel_type, values))
}
