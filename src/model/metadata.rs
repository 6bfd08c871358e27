use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PixelType {
    U8,
    U16,
    I16,
    #[default]
    F32,
}

/// How stored values map to brightness. `Monochrome1` displays low values as white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Photometric {
    Monochrome1,
    #[default]
    Monochrome2,
}

/// A VOI window: values inside `[center - width/2, center + width/2]` map onto the full
/// display range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLevel {
    pub center: f32,
    pub width: f32,
}

impl WindowLevel {
    pub const MIN_WIDTH: f32 = 1.0;

    pub fn new(center: f32, width: f32) -> Self {
        Self {
            center,
            width: width.max(Self::MIN_WIDTH),
        }
    }

    pub fn from_range(min: f32, max: f32) -> Self {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        Self::new((low + high) * 0.5, high - low)
    }

    pub fn lower(&self) -> f32 {
        self.center - self.width * 0.5
    }

    pub fn upper(&self) -> f32 {
        self.center + self.width * 0.5
    }

    /// Maps a modality value into `[0, 1]`.
    pub fn apply(&self, value: f32) -> f32 {
        ((value - self.lower()) / self.width).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub rows: usize,
    pub columns: usize,
    pub pixel_type: PixelType,
    pub photometric: Photometric,
    pub modality: Option<String>,
    pub rescale_slope: f32,
    pub rescale_intercept: f32,
    pub window: Option<WindowLevel>,
    /// Row and column spacing in millimetres.
    pub pixel_spacing: Option<(f32, f32)>,
    pub source: Option<String>,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            rows: 0,
            columns: 0,
            pixel_type: PixelType::F32,
            photometric: Photometric::Monochrome2,
            modality: None,
            rescale_slope: 1.0,
            rescale_intercept: 0.0,
            window: None,
            pixel_spacing: None,
            source: None,
            extras: BTreeMap::new(),
        }
    }
}

impl FrameMetadata {
    pub fn from_shape(rows: usize, columns: usize, pixel_type: PixelType) -> Self {
        Self {
            rows,
            columns,
            pixel_type,
            ..Self::default()
        }
    }

    pub fn validate_shape(&self, (rows, columns): (usize, usize)) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(CoreError::EmptyFrame {
                rows: self.rows,
                columns: self.columns,
            });
        }
        if self.rows != rows || self.columns != columns {
            return Err(CoreError::ShapeMismatch {
                data_rows: rows,
                data_columns: columns,
                meta_rows: self.rows,
                meta_columns: self.columns,
            });
        }
        if !self.rescale_slope.is_finite() || self.rescale_slope == 0.0 {
            return Err(CoreError::InvalidMetadata(format!(
                "rescale slope must be finite and non-zero, found {}",
                self.rescale_slope
            )));
        }
        if let Some((row, column)) = self.pixel_spacing
            && (row <= 0.0 || column <= 0.0)
        {
            return Err(CoreError::InvalidMetadata(format!(
                "pixel spacing must be positive, found {row}\\{column}"
            )));
        }
        Ok(())
    }

    pub fn modality_value(&self, stored: f32) -> f32 {
        stored * self.rescale_slope + self.rescale_intercept
    }
}
