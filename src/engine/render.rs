use rayon::prelude::*;

use crate::model::Frame;

use super::Viewport;

/// 8-bit grayscale output of one render pass, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RenderedImage {
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width)
            .then(|| self.pixels.get(y * self.width + x).copied())
            .flatten()
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|value| [*value, *value, *value, 255])
            .collect()
    }
}

/// Renders `frame` into a `width` x `height` canvas: modality rescale, VOI window, optional
/// inversion, then the inverse viewport transform sampled nearest-neighbour. Canvas pixels
/// that fall outside the image stay black.
pub(crate) fn render_frame(
    frame: &Frame,
    viewport: &Viewport,
    width: u32,
    height: u32,
) -> RenderedImage {
    let (width, height) = (width as usize, height as usize);
    let mut pixels = vec![0_u8; width * height];
    if width == 0 || height == 0 || viewport.scale <= 0.0 {
        return RenderedImage {
            width,
            height,
            pixels,
        };
    }

    let half_canvas = (width as f32 * 0.5, height as f32 * 0.5);
    let half_image = (frame.width() as f32 * 0.5, frame.height() as f32 * 0.5);
    let metadata = &frame.metadata;

    pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, line)| {
            let dy = row as f32 + 0.5 - half_canvas.1 - viewport.translation.1;
            for (column, pixel) in line.iter_mut().enumerate() {
                let dx = column as f32 + 0.5 - half_canvas.0 - viewport.translation.0;
                let (ix, iy) = viewport
                    .rotation
                    .invert(dx / viewport.scale, dy / viewport.scale);
                let (ix, iy) = (ix + half_image.0, iy + half_image.1);
                if ix < 0.0 || iy < 0.0 {
                    continue;
                }
                let Some(stored) = frame.data.get((iy as usize, ix as usize)) else {
                    continue;
                };
                let mut level = viewport.voi.apply(metadata.modality_value(*stored));
                if viewport.invert {
                    level = 1.0 - level;
                }
                *pixel = (level * 255.0).round() as u8;
            }
        });

    RenderedImage {
        width,
        height,
        pixels,
    }
}
