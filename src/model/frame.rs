use ndarray::Array2;

use super::{FrameMetadata, PixelType, Result, WindowLevel};

/// One decoded 2-D image. `data` holds stored values indexed `[row, column]`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Array2<f32>,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f32>, metadata: FrameMetadata) -> Result<Self> {
        metadata.validate_shape(data.dim())?;
        Ok(Self { data, metadata })
    }

    pub fn from_data(data: Array2<f32>, pixel_type: PixelType) -> Result<Self> {
        let (rows, columns) = data.dim();
        Self::new(data, FrameMetadata::from_shape(rows, columns, pixel_type))
    }

    pub fn width(&self) -> usize {
        self.metadata.columns
    }

    pub fn height(&self) -> usize {
        self.metadata.rows
    }

    pub fn stored_min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        }))
    }

    pub fn modality_min_max(&self) -> Option<(f32, f32)> {
        let (min, max) = self.stored_min_max()?;
        let a = self.metadata.modality_value(min);
        let b = self.metadata.modality_value(max);
        Some((a.min(b), a.max(b)))
    }

    /// Modality value at image coordinates, `None` outside the frame.
    pub fn modality_at(&self, x: f32, y: f32) -> Option<f32> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (column, row) = (x.floor() as usize, y.floor() as usize);
        self.data
            .get((row, column))
            .map(|stored| self.metadata.modality_value(*stored))
    }

    /// The window stored with the image, or one spanning the full modality range.
    pub fn default_window(&self) -> WindowLevel {
        self.metadata.window.unwrap_or_else(|| {
            let (min, max) = self.modality_min_max().unwrap_or((0.0, 1.0));
            WindowLevel::from_range(min, max)
        })
    }
}
