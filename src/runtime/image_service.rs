use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::engine::{
    ImagingRuntime, ModuleLoader, RenderedImage, Rotation, RuntimeBootstrap,
};
use crate::formats::write_gray_png;
use crate::model::{Frame, FrameMetadata, WindowLevel};
use crate::viewer::{
    Overlay, Preset, ViewerControls, ViewerOptions, ViewerShell, ViewerSurface,
};

use super::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub image_id: String,
    pub width: usize,
    pub height: usize,
    pub modality_range: Option<(f32, f32)>,
    pub default_window: WindowLevel,
    pub metadata: FrameMetadata,
}

impl FrameReport {
    pub fn new(image_id: &str, frame: &Frame) -> Self {
        Self {
            image_id: image_id.to_string(),
            width: frame.width(),
            height: frame.height(),
            modality_range: frame.modality_min_max(),
            default_window: frame.default_window(),
            metadata: frame.metadata.clone(),
        }
    }
}

/// Headless render settings, applied in field order through the viewer controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    pub image_id: String,
    pub preset: Option<Preset>,
    pub window: Option<(f32, f32)>,
    /// Positive steps zoom in, negative zoom out.
    pub zoom_steps: i32,
    pub rotate_degrees: i32,
    pub invert: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub output: PathBuf,
    pub width: usize,
    pub height: usize,
    pub overlay: Overlay,
}

#[derive(Debug, Clone)]
pub struct ImageService {
    config: Arc<AppConfig>,
    modules: Arc<ModuleLoader>,
}

impl ImageService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            modules: Arc::new(ModuleLoader::new()),
        }
    }

    pub fn bootstrap(&self) -> RuntimeBootstrap {
        RuntimeBootstrap::new(
            Arc::clone(&self.modules),
            self.config.runtime.modules.clone(),
            self.config.runtime_options(),
        )
    }

    pub fn runtime(&self) -> Result<ImagingRuntime> {
        let (runtime, report) = self.bootstrap().start()?;
        for failure in &report.failed {
            log::warn!("runtime module `{}` unavailable: {}", failure.name, failure.reason);
        }
        Ok(runtime)
    }

    pub fn inspect(&self, image_id: &str) -> Result<FrameReport> {
        let frame = self.runtime()?.loaders().load(image_id)?;
        Ok(FrameReport::new(image_id, &frame))
    }

    /// Mounts a viewer for `image_ids`, falling back to the placeholder when the runtime fails.
    pub fn mount(&self, container_id: &str, image_ids: Vec<String>) -> ViewerSurface {
        let options = ViewerOptions {
            background_loads: true,
            ..self.config.viewer.options()
        };
        ViewerSurface::mount(
            self.config.viewer.container(container_id),
            image_ids,
            options,
            &self.bootstrap(),
        )
    }

    pub fn render(&self, request: &RenderRequest) -> Result<(RenderedImage, Overlay)> {
        let rotation = Rotation::from_degrees(request.rotate_degrees).ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "rotation must be a multiple of 90 degrees, found {}",
                request.rotate_degrees
            ))
        })?;

        let mut container = self.config.viewer.container("render");
        container.width = request.width.unwrap_or(container.width);
        container.height = request.height.unwrap_or(container.height);

        let mut shell = ViewerShell::new(
            container,
            vec![request.image_id.clone()],
            self.config.viewer.options(),
        );
        shell.initialize(&self.bootstrap())?;
        if shell.frame().is_none() {
            let reason = shell.error().unwrap_or("no image was displayed");
            return Err(AppError::Display(reason.to_string()));
        }

        if let Some(preset) = request.preset {
            shell.apply_preset(preset);
        }
        if let Some((center, width)) = request.window {
            shell.set_window_level(center, width);
        }
        for _ in 0..request.zoom_steps.unsigned_abs() {
            if request.zoom_steps > 0 {
                shell.zoom_in();
            } else {
                shell.zoom_out();
            }
        }
        for _ in 0..rotation.degrees() / 90 {
            shell.rotate_clockwise();
        }
        if request.invert {
            shell.toggle_invert();
        }
        if let Some(error) = shell.error() {
            return Err(AppError::Display(error.to_string()));
        }

        let image = shell.render()?;
        Ok((image, shell.overlay()))
    }

    pub fn render_to_file(&self, request: &RenderRequest, output: &Path) -> Result<RenderReport> {
        let (image, overlay) = self.render(request)?;
        write_gray_png(output, image.width, image.height, &image.pixels)?;
        log::info!("rendered {} to {}", request.image_id, output.display());
        Ok(RenderReport {
            output: output.to_path_buf(),
            width: image.width,
            height: image.height,
            overlay,
        })
    }
}
