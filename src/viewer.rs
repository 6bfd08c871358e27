mod annotations;
mod error;
mod fallback;
mod input;
mod playback;
mod presets;
mod shell;
mod surface;

#[cfg(test)]
mod tests;

pub use annotations::{
    Annotation, AnnotationStore, CanvasAnnotation, Measurement, Shape, measure,
};
pub use error::{Result, ViewerError};
pub use fallback::FallbackViewer;
pub use input::{PointerButton, PointerEvent};
pub use playback::Playback;
pub use presets::Preset;
pub use shell::{ViewerOptions, ViewerShell, ViewerStatus};
pub use surface::{Overlay, ViewerControls, ViewerSurface};
