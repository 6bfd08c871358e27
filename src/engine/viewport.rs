use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Frame, Photometric, WindowLevel};

use super::render::{RenderedImage, render_frame};
use super::{EngineError, Result};

/// Drawing surface a viewport controller is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl Container {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub const fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Rotates an image-space offset clockwise into canvas space (y grows downwards).
    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Self::Deg0 => (x, y),
            Self::Deg90 => (-y, x),
            Self::Deg180 => (-x, -y),
            Self::Deg270 => (y, -x),
        }
    }

    pub fn invert(self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Self::Deg0 => (x, y),
            Self::Deg90 => (y, -x),
            Self::Deg180 => (-x, -y),
            Self::Deg270 => (-y, x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 10.0,
        }
    }
}

impl ScaleBounds {
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min, self.max)
    }
}

/// Display state of one image: how stored pixels map onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f32,
    pub translation: (f32, f32),
    pub rotation: Rotation,
    pub voi: WindowLevel,
    pub invert: bool,
}

/// Display capability of the imaging runtime, bound to one container.
pub trait ViewportController: Send {
    fn container_id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Releases the container. Every later mutating call fails with `ContainerDisabled`.
    fn disable(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    fn canvas_size(&self) -> (u32, u32);

    /// Replaces the displayed image. The viewport is kept when the new frame has the same
    /// dimensions as the previous one, otherwise it is reset for the new frame.
    fn display(&mut self, frame: Arc<Frame>) -> Result<()>;

    fn frame(&self) -> Option<Arc<Frame>>;

    fn viewport(&self) -> Option<Viewport>;

    /// Applies `viewport` after clamping scale and window width. Returns what was applied.
    fn set_viewport(&mut self, viewport: Viewport) -> Result<Viewport>;

    fn fit_to_window(&mut self) -> Result<()>;

    fn rotate(&mut self, rotation: Rotation) -> Result<()>;

    fn reset(&mut self) -> Result<()>;

    fn render(&self) -> Result<RenderedImage>;

    fn canvas_to_image(&self, x: f32, y: f32) -> Option<(f32, f32)>;

    fn image_to_canvas(&self, x: f32, y: f32) -> Option<(f32, f32)>;
}

#[derive(Debug, Clone)]
pub struct SoftwareViewport {
    container_id: String,
    width: u32,
    height: u32,
    enabled: bool,
    bounds: ScaleBounds,
    frame: Option<Arc<Frame>>,
    viewport: Option<Viewport>,
}

impl SoftwareViewport {
    pub fn new(container: &Container, bounds: ScaleBounds) -> Self {
        Self {
            container_id: container.id.clone(),
            width: container.width,
            height: container.height,
            enabled: true,
            bounds,
            frame: None,
            viewport: None,
        }
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(EngineError::ContainerDisabled(self.container_id.clone()))
        }
    }

    fn current(&self) -> Result<(&Arc<Frame>, Viewport)> {
        self.ensure_enabled()?;
        self.frame
            .as_ref()
            .zip(self.viewport)
            .ok_or(EngineError::NoImage)
    }

    fn fit_scale(&self, frame: &Frame, rotation: Rotation) -> f32 {
        let (width, height) = if rotation.is_transposed() {
            (frame.height(), frame.width())
        } else {
            (frame.width(), frame.height())
        };
        let horizontal = self.width as f32 / width.max(1) as f32;
        let vertical = self.height as f32 / height.max(1) as f32;
        self.bounds.clamp(horizontal.min(vertical))
    }

    fn default_viewport(&self, frame: &Frame) -> Viewport {
        Viewport {
            scale: self.fit_scale(frame, Rotation::Deg0),
            translation: (0.0, 0.0),
            rotation: Rotation::Deg0,
            voi: frame.default_window(),
            invert: frame.metadata.photometric == Photometric::Monochrome1,
        }
    }

    fn centers(&self, frame: &Frame) -> ((f32, f32), (f32, f32)) {
        (
            (self.width as f32 * 0.5, self.height as f32 * 0.5),
            (frame.width() as f32 * 0.5, frame.height() as f32 * 0.5),
        )
    }
}

impl ViewportController for SoftwareViewport {
    fn container_id(&self) -> &str {
        &self.container_id
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.frame = None;
        self.viewport = None;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display(&mut self, frame: Arc<Frame>) -> Result<()> {
        self.ensure_enabled()?;
        let same_shape = self.frame.as_ref().is_some_and(|previous| {
            previous.width() == frame.width() && previous.height() == frame.height()
        });
        if !same_shape || self.viewport.is_none() {
            self.viewport = Some(self.default_viewport(&frame));
        }
        self.frame = Some(frame);
        Ok(())
    }

    fn frame(&self) -> Option<Arc<Frame>> {
        self.frame.clone()
    }

    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<Viewport> {
        self.current()?;
        if !viewport.scale.is_finite() || viewport.scale <= 0.0 {
            return Err(EngineError::InvalidViewport(format!(
                "scale must be positive, got {}",
                viewport.scale
            )));
        }
        let (tx, ty) = viewport.translation;
        if !tx.is_finite() || !ty.is_finite() {
            return Err(EngineError::InvalidViewport(
                "translation must be finite".to_string(),
            ));
        }
        if !viewport.voi.center.is_finite() || !viewport.voi.width.is_finite() {
            return Err(EngineError::InvalidViewport(
                "window must be finite".to_string(),
            ));
        }

        let applied = Viewport {
            scale: self.bounds.clamp(viewport.scale),
            voi: WindowLevel::new(viewport.voi.center, viewport.voi.width),
            ..viewport
        };
        self.viewport = Some(applied);
        Ok(applied)
    }

    fn fit_to_window(&mut self) -> Result<()> {
        let (frame, mut viewport) = self.current()?;
        viewport.scale = self.fit_scale(frame, viewport.rotation);
        viewport.translation = (0.0, 0.0);
        self.viewport = Some(viewport);
        Ok(())
    }

    fn rotate(&mut self, rotation: Rotation) -> Result<()> {
        let (_, mut viewport) = self.current()?;
        viewport.rotation = rotation;
        self.viewport = Some(viewport);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let (frame, _) = self.current()?;
        let viewport = self.default_viewport(frame);
        self.viewport = Some(viewport);
        Ok(())
    }

    fn render(&self) -> Result<RenderedImage> {
        let (frame, viewport) = self.current()?;
        Ok(render_frame(frame, &viewport, self.width, self.height))
    }

    fn canvas_to_image(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (frame, viewport) = self.current().ok()?;
        let (canvas_center, image_center) = self.centers(frame);
        let dx = (x - canvas_center.0 - viewport.translation.0) / viewport.scale;
        let dy = (y - canvas_center.1 - viewport.translation.1) / viewport.scale;
        let (ix, iy) = viewport.rotation.invert(dx, dy);
        Some((ix + image_center.0, iy + image_center.1))
    }

    fn image_to_canvas(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (frame, viewport) = self.current().ok()?;
        let (canvas_center, image_center) = self.centers(frame);
        let (rx, ry) = viewport
            .rotation
            .apply(x - image_center.0, y - image_center.1);
        Some((
            rx * viewport.scale + canvas_center.0 + viewport.translation.0,
            ry * viewport.scale + canvas_center.1 + viewport.translation.1,
        ))
    }
}
