use std::time::Instant;

use serde::Serialize;

use crate::engine::{Container, RenderedImage, RuntimeBootstrap, ToolName};
use crate::model::WindowLevel;

use super::{FallbackViewer, PointerEvent, Preset, ViewerOptions, ViewerShell};

/// What the host draws over the image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub zoom_percent: u32,
    pub window: Option<WindowLevel>,
    pub rotation: u16,
    /// 0-based index of the displayed image.
    pub index: usize,
    pub total: usize,
    pub playing: bool,
    pub tool: Option<ToolName>,
    pub error: Option<String>,
    /// Summary of the latest measurement on the displayed image.
    pub measurement: Option<String>,
    pub fallback: bool,
}

impl Overlay {
    pub fn position(&self) -> String {
        if self.total == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", self.index + 1, self.total)
        }
    }
}

impl std::fmt::Display for Overlay {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "Zoom {}%", self.zoom_percent)?;
        if let Some(window) = self.window {
            write!(formatter, " | W {:.0} L {:.0}", window.width, window.center)?;
        }
        write!(formatter, " | {}\u{b0} | {}", self.rotation, self.position())?;
        if let Some(measurement) = &self.measurement {
            write!(formatter, " | {measurement}")?;
        }
        if let Some(error) = &self.error {
            write!(formatter, " | {error}")?;
        }
        Ok(())
    }
}

/// Control surface shared by the live viewer and its fallback. Calls never fail: problems
/// are logged and shown through [`Overlay::error`].
pub trait ViewerControls {
    fn set_tool(&mut self, tool: ToolName);

    fn active_tool(&self) -> Option<ToolName>;

    fn zoom_in(&mut self);

    fn zoom_out(&mut self);

    fn fit_to_window(&mut self);

    fn rotate_clockwise(&mut self);

    fn reset(&mut self);

    fn set_window_level(&mut self, center: f32, width: f32);

    fn apply_preset(&mut self, preset: Preset) {
        let (center, width) = preset.center_width();
        self.set_window_level(center, width);
    }

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    fn toggle_playback(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn next_image(&mut self);

    fn previous_image(&mut self);

    /// Jumps to `index`. Playback keeps running.
    fn seek(&mut self, index: usize);

    /// Advances playback when its interval has elapsed. Returns true if the image changed.
    fn tick(&mut self, now: Instant) -> bool;

    fn current_index(&self) -> usize;

    fn image_count(&self) -> usize;

    fn overlay(&self) -> Overlay;

    fn unmount(&mut self);
}

/// The viewer a host mounts: the live shell, or the fallback when it could not start.
#[derive(Debug)]
pub enum ViewerSurface {
    Live(Box<ViewerShell>),
    Fallback(FallbackViewer),
}

impl ViewerSurface {
    pub fn mount(
        container: Container,
        image_ids: Vec<String>,
        options: ViewerOptions,
        bootstrap: &RuntimeBootstrap,
    ) -> Self {
        let mut shell = ViewerShell::new(container, image_ids.clone(), options.clone());
        match shell.initialize(bootstrap) {
            Ok(_) => Self::Live(Box::new(shell)),
            Err(error) => {
                log::warn!("falling back to the placeholder viewer: {error}");
                Self::Fallback(FallbackViewer::new(image_ids, error.to_string(), options))
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn controls(&self) -> &dyn ViewerControls {
        match self {
            Self::Live(shell) => &**shell,
            Self::Fallback(fallback) => fallback,
        }
    }

    pub fn controls_mut(&mut self) -> &mut dyn ViewerControls {
        match self {
            Self::Live(shell) => &mut **shell,
            Self::Fallback(fallback) => fallback,
        }
    }

    pub fn shell(&self) -> Option<&ViewerShell> {
        match self {
            Self::Live(shell) => Some(&**shell),
            Self::Fallback(_) => None,
        }
    }

    pub fn shell_mut(&mut self) -> Option<&mut ViewerShell> {
        match self {
            Self::Live(shell) => Some(&mut **shell),
            Self::Fallback(_) => None,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Live(_) => None,
            Self::Fallback(fallback) => Some(fallback.reason()),
        }
    }

    /// The fallback has nothing to draw.
    pub fn render(&self) -> Option<RenderedImage> {
        let Self::Live(shell) = self else {
            return None;
        };
        shell
            .render()
            .inspect_err(|error| log::debug!("render skipped: {error}"))
            .ok()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if let Self::Live(shell) = self {
            shell.handle_pointer(event);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Self::Live(shell) = self {
            shell.resize(width, height);
        }
    }

    pub fn poll_loads(&mut self) -> bool {
        match self {
            Self::Live(shell) => shell.poll_loads(),
            Self::Fallback(_) => false,
        }
    }
}
