use std::time::Instant;

use crate::engine::{Rotation, ToolName};
use crate::model::WindowLevel;

use super::{Overlay, Playback, ViewerControls, ViewerOptions};

/// Placeholder with the live viewer's controls, used when the runtime cannot start.
/// Every control only updates local state.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackViewer {
    reason: String,
    image_ids: Vec<String>,
    options: ViewerOptions,
    index: usize,
    tool: ToolName,
    scale: f32,
    rotation: Rotation,
    window: WindowLevel,
    playback: Playback,
    mounted: bool,
}

impl FallbackViewer {
    pub fn new(image_ids: Vec<String>, reason: impl Into<String>, options: ViewerOptions) -> Self {
        Self {
            reason: reason.into(),
            image_ids,
            playback: Playback::new(options.playback_interval),
            options,
            index: 0,
            tool: ToolName::Wwwc,
            scale: 1.0,
            rotation: Rotation::Deg0,
            window: Self::default_window(),
            mounted: true,
        }
    }

    fn default_window() -> WindowLevel {
        WindowLevel::new(40.0, 400.0)
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl ViewerControls for FallbackViewer {
    fn set_tool(&mut self, tool: ToolName) {
        if ToolName::PRIMARY.contains(&tool) {
            self.tool = tool;
        }
    }

    fn active_tool(&self) -> Option<ToolName> {
        Some(self.tool)
    }

    fn zoom_in(&mut self) {
        self.scale = self
            .options
            .scale_bounds
            .clamp(self.scale * self.options.zoom_factor);
    }

    fn zoom_out(&mut self) {
        self.scale = self
            .options
            .scale_bounds
            .clamp(self.scale / self.options.zoom_factor);
    }

    fn fit_to_window(&mut self) {
        self.scale = 1.0;
    }

    fn rotate_clockwise(&mut self) {
        self.rotation = self.rotation.clockwise();
    }

    fn reset(&mut self) {
        self.scale = 1.0;
        self.rotation = Rotation::Deg0;
        self.window = Self::default_window();
    }

    fn set_window_level(&mut self, center: f32, width: f32) {
        if center.is_finite() && width.is_finite() {
            self.window = WindowLevel::new(center, width);
        }
    }

    fn play(&mut self) {
        if self.image_ids.len() > 1 {
            if Playback::next_index(self.index, self.image_ids.len()).is_none() {
                self.index = 0;
            }
            self.playback.start(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.playback.stop();
    }

    fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    fn next_image(&mut self) {
        if let Some(next) = Playback::next_index(self.index, self.image_ids.len()) {
            self.index = next;
        }
    }

    fn previous_image(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    fn seek(&mut self, index: usize) {
        if index < self.image_ids.len() {
            self.index = index;
        }
    }

    fn tick(&mut self, now: Instant) -> bool {
        if !self.playback.due(now) {
            return false;
        }
        let total = self.image_ids.len();
        let Some(next) = Playback::next_index(self.index, total) else {
            self.playback.stop();
            return false;
        };
        self.index = next;
        if Playback::next_index(next, total).is_none() {
            self.playback.stop();
        }
        true
    }

    fn current_index(&self) -> usize {
        self.index
    }

    fn image_count(&self) -> usize {
        self.image_ids.len()
    }

    fn overlay(&self) -> Overlay {
        Overlay {
            zoom_percent: (self.scale * 100.0).round() as u32,
            window: Some(self.window),
            rotation: self.rotation.degrees(),
            index: self.index,
            total: self.image_ids.len(),
            playing: self.playback.is_playing(),
            tool: Some(self.tool),
            error: Some(format!("viewer unavailable: {}", self.reason)),
            measurement: None,
            fallback: true,
        }
    }

    fn unmount(&mut self) {
        self.playback.stop();
        self.mounted = false;
    }
}
