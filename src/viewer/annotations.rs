use serde::Serialize;

use crate::engine::ToolName;
use crate::model::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Length { start: (f32, f32), end: (f32, f32) },
    Rectangle { start: (f32, f32), end: (f32, f32) },
    Ellipse { start: (f32, f32), end: (f32, f32) },
}

impl Shape {
    pub fn for_tool(tool: ToolName, start: (f32, f32)) -> Option<Self> {
        let end = start;
        match tool {
            ToolName::Length => Some(Self::Length { start, end }),
            ToolName::RectangleRoi => Some(Self::Rectangle { start, end }),
            ToolName::EllipticalRoi => Some(Self::Ellipse { start, end }),
            _ => None,
        }
    }

    pub fn with_end(self, end: (f32, f32)) -> Self {
        match self {
            Self::Length { start, .. } => Self::Length { start, end },
            Self::Rectangle { start, .. } => Self::Rectangle { start, end },
            Self::Ellipse { start, .. } => Self::Ellipse { start, end },
        }
    }

    pub fn endpoints(&self) -> ((f32, f32), (f32, f32)) {
        match *self {
            Self::Length { start, end }
            | Self::Rectangle { start, end }
            | Self::Ellipse { start, end } => (start, end),
        }
    }

    /// Moves both endpoints through `map`, e.g. from image to canvas coordinates.
    pub fn map_points(self, mut map: impl FnMut((f32, f32)) -> Option<(f32, f32)>) -> Option<Self> {
        let (start, end) = self.endpoints();
        let (start, end) = (map(start)?, map(end)?);
        Some(match self {
            Self::Length { .. } => Self::Length { start, end },
            Self::Rectangle { .. } => Self::Rectangle { start, end },
            Self::Ellipse { .. } => Self::Ellipse { start, end },
        })
    }

    fn corners(&self) -> ((f32, f32), (f32, f32)) {
        match *self {
            Self::Length { start, end }
            | Self::Rectangle { start, end }
            | Self::Ellipse { start, end } => (
                (start.0.min(end.0), start.1.min(end.1)),
                (start.0.max(end.0), start.1.max(end.1)),
            ),
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        let (min, max) = self.corners();
        match self {
            Self::Length { .. } => false,
            Self::Rectangle { .. } => x >= min.0 && x <= max.0 && y >= min.1 && y <= max.1,
            Self::Ellipse { .. } => {
                let (rx, ry) = ((max.0 - min.0) * 0.5, (max.1 - min.1) * 0.5);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let (cx, cy) = (min.0 + rx, min.1 + ry);
                let (nx, ny) = ((x - cx) / rx, (y - cy) / ry);
                nx * nx + ny * ny <= 1.0
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// `mm` when the frame carries pixel spacing, `px` otherwise.
    pub unit: &'static str,
    pub length: Option<f32>,
    pub area: Option<f32>,
    pub mean: Option<f32>,
    pub std_dev: Option<f32>,
    pub pixel_count: usize,
}

impl Measurement {
    pub fn summary(&self) -> String {
        if let Some(length) = self.length {
            return format!("{length:.1} {}", self.unit);
        }
        let area = self.area.unwrap_or_default();
        match (self.mean, self.std_dev) {
            (Some(mean), Some(std_dev)) => format!(
                "area {area:.1} {}\u{b2}, mean {mean:.1}, sd {std_dev:.1}",
                self.unit
            ),
            _ => format!("area {area:.1} {}\u{b2}", self.unit),
        }
    }
}

/// Measures `shape` against the modality values of `frame`.
pub fn measure(shape: &Shape, frame: &Frame) -> Measurement {
    let (row_mm, column_mm, unit) = match frame.metadata.pixel_spacing {
        Some((row, column)) => (row, column, "mm"),
        None => (1.0, 1.0, "px"),
    };

    if let Shape::Length { start, end } = *shape {
        let dx = (end.0 - start.0) * column_mm;
        let dy = (end.1 - start.1) * row_mm;
        return Measurement {
            unit,
            length: Some((dx * dx + dy * dy).sqrt()),
            area: None,
            mean: None,
            std_dev: None,
            pixel_count: 0,
        };
    }

    let (min, max) = shape.corners();
    let (width, height) = (max.0 - min.0, max.1 - min.1);
    let area = match shape {
        Shape::Ellipse { .. } => std::f32::consts::PI * width * 0.5 * height * 0.5,
        _ => width * height,
    } * row_mm
        * column_mm;

    let first_row = min.1.floor().max(0.0) as usize;
    let first_column = min.0.floor().max(0.0) as usize;
    let last_row = (max.1.ceil().max(0.0) as usize).min(frame.height());
    let last_column = (max.0.ceil().max(0.0) as usize).min(frame.width());

    let mut values = Vec::new();
    for row in first_row..last_row {
        for column in first_column..last_column {
            let (cx, cy) = (column as f32 + 0.5, row as f32 + 0.5);
            if shape.contains(cx, cy)
                && let Some(value) = frame.modality_at(cx, cy)
            {
                values.push(value);
            }
        }
    }

    let (mean, std_dev) = if values.is_empty() {
        (None, None)
    } else {
        let count = values.len() as f32;
        let mean = values.iter().sum::<f32>() / count;
        let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f32>() / count;
        (Some(mean), Some(variance.sqrt()))
    };

    Measurement {
        unit,
        length: None,
        area: Some(area),
        mean,
        std_dev,
        pixel_count: values.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub id: u64,
    pub image_index: usize,
    pub shape: Shape,
    pub measurement: Measurement,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveShape {
    image_index: usize,
    shape: Shape,
}

/// Committed measurements per stack image, plus the one being drawn.
/// An annotation as the host draws it, in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasAnnotation {
    pub shape: Shape,
    /// Measurement summary; `None` while the shape is still being drawn.
    pub label: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    active: Option<ActiveShape>,
    committed: Vec<Annotation>,
    selected: Option<u64>,
    next_id: u64,
}

impl AnnotationStore {
    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    pub fn begin(&mut self, image_index: usize, shape: Shape) {
        self.active = Some(ActiveShape { image_index, shape });
    }

    pub fn update_active(&mut self, end: (f32, f32)) {
        if let Some(active) = &mut self.active {
            active.shape = active.shape.with_end(end);
        }
    }

    pub fn active(&self) -> Option<&Shape> {
        self.active.as_ref().map(|active| &active.shape)
    }

    /// Measures the active shape against `frame` and keeps it. Zero-sized shapes are dropped.
    pub fn commit(&mut self, frame: &Frame) -> Option<&Annotation> {
        let active = self.active.take()?;
        let (min, max) = active.shape.corners();
        if max.0 - min.0 <= 0.0 && max.1 - min.1 <= 0.0 {
            return None;
        }
        let annotation = Annotation {
            id: self.next_id(),
            image_index: active.image_index,
            measurement: measure(&active.shape, frame),
            shape: active.shape,
        };
        log::debug!(
            "annotation {} on image {}: {}",
            annotation.id,
            annotation.image_index,
            annotation.measurement.summary()
        );
        self.selected = Some(annotation.id);
        self.committed.push(annotation);
        self.committed.last()
    }

    pub fn abort_active(&mut self) {
        self.active = None;
    }

    pub fn clear_all(&mut self) {
        self.active = None;
        self.committed.clear();
        self.selected = None;
    }

    pub fn all(&self) -> &[Annotation] {
        &self.committed
    }

    pub fn for_image(&self, image_index: usize) -> impl Iterator<Item = &Annotation> {
        self.committed
            .iter()
            .filter(move |annotation| annotation.image_index == image_index)
    }

    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    pub fn remove_selected(&mut self) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        let before = self.committed.len();
        self.committed.retain(|annotation| annotation.id != id);
        before != self.committed.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::{AnnotationStore, Shape, measure};
    use crate::engine::ToolName;
    use crate::model::{Frame, PixelType};

    fn frame() -> Frame {
        let data = Array2::from_shape_fn((4, 4), |(row, _)| row as f32 * 10.0);
        Frame::from_data(data, PixelType::U16).expect("frame")
    }

    #[test]
    fn length_uses_pixel_spacing_when_present() {
        let mut frame = frame();
        let shape = Shape::Length {
            start: (0.0, 0.0),
            end: (3.0, 4.0),
        };
        let measurement = measure(&shape, &frame);
        assert_eq!(measurement.unit, "px");
        assert_eq!(measurement.length, Some(5.0));

        frame.metadata.pixel_spacing = Some((0.5, 0.5));
        let measurement = measure(&shape, &frame);
        assert_eq!(measurement.unit, "mm");
        assert_eq!(measurement.length, Some(2.5));
    }

    #[test]
    fn rectangle_statistics_cover_enclosed_pixels() {
        let shape = Shape::Rectangle {
            start: (0.0, 0.0),
            end: (4.0, 2.0),
        };
        let measurement = measure(&shape, &frame());
        assert_eq!(measurement.pixel_count, 8);
        assert_eq!(measurement.area, Some(8.0));
        assert_eq!(measurement.mean, Some(5.0));
        assert_eq!(measurement.std_dev, Some(5.0));
    }

    #[test]
    fn ellipse_excludes_corners() {
        let shape = Shape::Ellipse {
            start: (0.0, 0.0),
            end: (4.0, 4.0),
        };
        let measurement = measure(&shape, &frame());
        assert_eq!(measurement.pixel_count, 12);
        assert!((measurement.area.unwrap_or_default() - std::f32::consts::PI * 4.0).abs() < 1e-4);
    }

    #[test]
    fn store_commits_per_image_and_drops_empty_shapes() {
        let frame = frame();
        let mut store = AnnotationStore::default();

        let shape = Shape::for_tool(ToolName::RectangleRoi, (1.0, 1.0)).expect("shape");
        store.begin(2, shape);
        assert!(store.commit(&frame).is_none());

        store.begin(2, shape);
        store.update_active((3.0, 3.0));
        let id = store.commit(&frame).expect("annotation").id;
        assert_eq!(store.selected(), Some(id));
        assert_eq!(store.for_image(2).count(), 1);
        assert_eq!(store.for_image(0).count(), 0);

        assert!(store.remove_selected());
        assert!(store.all().is_empty());
        assert!(Shape::for_tool(ToolName::Pan, (0.0, 0.0)).is_none());
    }
}
