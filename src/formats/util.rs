use std::path::Path;

use crate::model::{FrameMetadata, PixelType};

pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
}

pub(crate) fn metadata_for(
    rows: usize,
    columns: usize,
    pixel_type: PixelType,
    source: &str,
) -> FrameMetadata {
    FrameMetadata {
        source: (!source.is_empty()).then(|| source.to_string()),
        ..FrameMetadata::from_shape(rows, columns, pixel_type)
    }
}

/// Parses the first value of a backslash-separated decimal string.
pub(crate) fn first_decimal(text: &str) -> Option<f32> {
    text.split('\\').next()?.trim().parse::<f32>().ok()
}

pub(crate) fn decimal_pair(text: &str) -> Option<(f32, f32)> {
    let mut values = text.split('\\').map(|value| value.trim().parse::<f32>());
    match (values.next(), values.next()) {
        (Some(Ok(first)), Some(Ok(second))) => Some((first, second)),
        _ => None,
    }
}
