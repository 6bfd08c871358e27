use ndarray::Array2;

use super::{CoreError, Frame, FrameMetadata, PixelType, WindowLevel};

fn ramp(rows: usize, columns: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, columns), |(row, column)| (row * columns + column) as f32)
}

#[test]
fn metadata_roundtrip_json() {
    let mut metadata = FrameMetadata::from_shape(4, 5, PixelType::I16);
    metadata.modality = Some("CT".into());
    metadata.window = Some(WindowLevel::new(40.0, 400.0));
    metadata
        .extras
        .insert("study_date".into(), serde_json::json!("20240101"));
    let serialized = serde_json::to_string_pretty(&metadata).expect("serialize metadata");
    let restored: FrameMetadata = serde_json::from_str(&serialized).expect("deserialize metadata");
    assert_eq!(restored, metadata);
}

#[test]
fn frame_rejects_mismatched_metadata() {
    let metadata = FrameMetadata::from_shape(3, 3, PixelType::U8);
    let error = Frame::new(ramp(2, 3), metadata).expect_err("shape mismatch");
    assert!(matches!(error, CoreError::ShapeMismatch { .. }));
}

#[test]
fn frame_rejects_zero_slope() {
    let mut metadata = FrameMetadata::from_shape(2, 2, PixelType::U16);
    metadata.rescale_slope = 0.0;
    assert!(Frame::new(ramp(2, 2), metadata).is_err());
}

#[test]
fn modality_values_apply_rescale() {
    let mut metadata = FrameMetadata::from_shape(2, 2, PixelType::U16);
    metadata.rescale_slope = 2.0;
    metadata.rescale_intercept = -1024.0;
    let frame = Frame::new(ramp(2, 2), metadata).expect("frame");
    assert_eq!(frame.modality_at(1.0, 1.0), Some(3.0 * 2.0 - 1024.0));
    assert_eq!(frame.modality_at(2.5, 0.0), None);
    assert_eq!(frame.modality_min_max(), Some((-1024.0, -1018.0)));
}

#[test]
fn default_window_spans_modality_range_when_absent() {
    let frame = Frame::from_data(ramp(2, 2), PixelType::F32).expect("frame");
    let window = frame.default_window();
    assert!((window.center - 1.5).abs() < f32::EPSILON);
    assert!((window.width - 3.0).abs() < f32::EPSILON);
}

#[test]
fn window_level_clamps_width_and_maps_edges() {
    let window = WindowLevel::new(100.0, 0.0);
    assert!((window.width - WindowLevel::MIN_WIDTH).abs() < f32::EPSILON);

    let window = WindowLevel::new(40.0, 400.0);
    assert_eq!(window.apply(-160.0), 0.0);
    assert_eq!(window.apply(240.0), 1.0);
    assert!((window.apply(40.0) - 0.5).abs() < 1e-6);
}
