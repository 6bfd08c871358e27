use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::engine::{
    self, Binding, BootstrapReport, Container, EngineError, ImagingRuntime, RenderedImage,
    RuntimeBootstrap, ScaleBounds, ToolName, ToolRegistry, Viewport, ViewportController,
};
use crate::loader::LoaderRegistry;
use crate::model::{Frame, WindowLevel};

use super::{
    AnnotationStore, CanvasAnnotation, Overlay, Playback, PointerButton, PointerEvent, Result, Shape,
    ViewerControls, ViewerError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    pub zoom_factor: f32,
    pub scale_bounds: ScaleBounds,
    pub playback_interval: Duration,
    /// Load images on worker threads and apply them from [`ViewerShell::poll_loads`].
    /// Interactive hosts set this so a slow fetch never blocks their event loop.
    pub background_loads: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            zoom_factor: 1.25,
            scale_bounds: ScaleBounds::default(),
            playback_interval: Duration::from_millis(500),
            background_loads: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewerStatus {
    Uninitialized,
    Ready,
    /// Bootstrap or binding failed; the host should show the fallback.
    Degraded,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveLoad {
    job_id: u64,
    generation: u64,
    index: usize,
}

struct LoadFinished {
    job_id: u64,
    generation: u64,
    result: Result<(usize, Frame)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    button: PointerButton,
    tool: ToolName,
    last: (f32, f32),
}

/// Loads `image_ids[index]`. A failure on the first slot is retried once with the second.
fn fetch_with_recovery(
    loaders: &LoaderRegistry,
    image_ids: &[String],
    index: usize,
) -> Result<(usize, Frame)> {
    if image_ids.is_empty() {
        return Err(ViewerError::EmptyStack);
    }
    let id = image_ids.get(index).ok_or(ViewerError::IndexOutOfRange {
        index,
        total: image_ids.len(),
    })?;
    match loaders.load(id) {
        Ok(frame) => Ok((index, frame)),
        Err(error) if index == 0 && image_ids.len() > 1 => {
            log::warn!("image 0 ({id}) failed: {error}; retrying with image 1");
            loaders
                .load(&image_ids[1])
                .map(|frame| (1, frame))
                .map_err(|source| ViewerError::ImageLoad { index: 1, source })
        }
        Err(source) => Err(ViewerError::ImageLoad { index, source }),
    }
}

/// One mounted image viewer bound to a container.
pub struct ViewerShell {
    container: Container,
    image_ids: Vec<String>,
    options: ViewerOptions,
    status: ViewerStatus,
    loaders: Option<Arc<LoaderRegistry>>,
    controller: Option<Box<dyn ViewportController>>,
    tools: Option<Box<dyn ToolRegistry>>,
    viewport: Option<Viewport>,
    index: usize,
    playback: Playback,
    annotations: AnnotationStore,
    error: Option<String>,
    generation: u64,
    next_job_id: u64,
    active_load: Option<ActiveLoad>,
    worker_tx: Sender<LoadFinished>,
    worker_rx: Receiver<LoadFinished>,
    drag: Option<DragState>,
}

impl std::fmt::Debug for ViewerShell {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ViewerShell")
            .field("container", &self.container)
            .field("status", &self.status)
            .field("index", &self.index)
            .field("images", &self.image_ids.len())
            .field("viewport", &self.viewport)
            .field("error", &self.error)
            .finish()
    }
}

impl ViewerShell {
    pub fn new(container: Container, image_ids: Vec<String>, options: ViewerOptions) -> Self {
        let (worker_tx, worker_rx) = mpsc::channel();
        Self {
            container,
            image_ids,
            playback: Playback::new(options.playback_interval),
            options,
            status: ViewerStatus::Uninitialized,
            loaders: None,
            controller: None,
            tools: None,
            viewport: None,
            index: 0,
            annotations: AnnotationStore::default(),
            error: None,
            generation: 0,
            next_job_id: 0,
            active_load: None,
            worker_tx,
            worker_rx,
            drag: None,
        }
    }

    /// Brings up the runtime, binds the container and shows the first image.
    pub fn initialize(&mut self, bootstrap: &RuntimeBootstrap) -> Result<BootstrapReport> {
        self.ensure_mounted()?;
        match bootstrap.start() {
            Ok((runtime, report)) => {
                self.attach(&runtime)?;
                Ok(report)
            }
            Err(error) => {
                self.degrade(&error);
                Err(error.into())
            }
        }
    }

    /// Binds an already bootstrapped runtime.
    pub fn attach(&mut self, runtime: &ImagingRuntime) -> Result<()> {
        self.ensure_mounted()?;
        let bound = runtime
            .enable(&self.container)
            .and_then(|controller| Ok((controller, runtime.tool_registry()?)));
        let (controller, tools) = match bound {
            Ok(bound) => bound,
            Err(error) => {
                self.degrade(&error);
                return Err(error.into());
            }
        };

        self.controller = Some(controller);
        self.tools = Some(tools);
        self.loaders = Some(runtime.loaders());
        self.status = ViewerStatus::Ready;
        self.error = None;
        log::info!(
            "viewer `{}` ready with {} image(s)",
            self.container.id,
            self.image_ids.len()
        );

        if !self.image_ids.is_empty() && !self.step_to(0) {
            log::debug!("viewer `{}` starts without an image", self.container.id);
        }
        Ok(())
    }

    fn degrade(&mut self, error: &EngineError) {
        log::error!("viewer `{}` degraded: {error}", self.container.id);
        self.status = ViewerStatus::Degraded;
        self.error = Some(error.to_string());
    }

    fn ensure_mounted(&self) -> Result<()> {
        match self.status {
            ViewerStatus::Unmounted => Err(ViewerError::Unmounted),
            _ => Ok(()),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.status {
            ViewerStatus::Ready => Ok(()),
            ViewerStatus::Unmounted => Err(ViewerError::Unmounted),
            ViewerStatus::Uninitialized | ViewerStatus::Degraded => Err(ViewerError::NotReady),
        }
    }

    fn ready_or_warn(&self, action: &str) -> bool {
        match self.ensure_ready() {
            Ok(()) => true,
            Err(error) => {
                log::warn!("{action} ignored: {error}");
                false
            }
        }
    }

    fn fail(&mut self, error: &ViewerError) {
        log::error!("viewer `{}`: {error}", self.container.id);
        self.error = Some(error.to_string());
    }

    pub fn status(&self) -> ViewerStatus {
        self.status
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn frame(&self) -> Option<Arc<Frame>> {
        self.controller.as_ref().and_then(|controller| controller.frame())
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Annotations on the displayed image, plus the one being drawn, in canvas coordinates.
    pub fn canvas_annotations(&self) -> Vec<CanvasAnnotation> {
        let Some(controller) = self.controller.as_ref() else {
            return Vec::new();
        };
        let to_canvas = |(x, y): (f32, f32)| controller.image_to_canvas(x, y);
        let selected = self.annotations.selected();
        let committed = self
            .annotations
            .for_image(self.index)
            .filter_map(|annotation| {
                Some(CanvasAnnotation {
                    shape: annotation.shape.map_points(to_canvas)?,
                    label: Some(annotation.measurement.summary()),
                    selected: selected == Some(annotation.id),
                })
            });
        let drawing = self
            .annotations
            .active()
            .and_then(|shape| shape.map_points(to_canvas))
            .map(|shape| CanvasAnnotation {
                shape,
                label: None,
                selected: false,
            });
        committed.chain(drawing).collect()
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear_all();
    }

    /// Deletes the most recently committed or selected measurement.
    pub fn remove_selected_annotation(&mut self) -> bool {
        self.annotations.remove_selected()
    }

    /// Index of the image being loaded in the background, if any.
    pub fn pending_index(&self) -> Option<usize> {
        self.active_load.map(|load| load.index)
    }

    pub fn tools_on(&self, binding: Binding) -> Vec<ToolName> {
        self.tools
            .as_ref()
            .map(|tools| tools.tools_on(binding))
            .unwrap_or_default()
    }

    /// Loads and displays `index`, replacing the current image.
    pub fn load_image(&mut self, index: usize) -> Result<()> {
        if let Err(error) = self.ensure_ready() {
            log::warn!("load of image {index} ignored: {error}");
            return Err(error);
        }
        let loaders = self.loaders.clone().ok_or(ViewerError::NotReady)?;
        self.generation = self.generation.saturating_add(1);
        self.active_load = None;

        let result = fetch_with_recovery(&loaders, &self.image_ids, index)
            .and_then(|(shown, frame)| self.show(shown, frame));
        if let Err(error) = &result {
            self.fail(error);
        }
        result
    }

    /// Starts loading `index` on a worker thread. The result is applied by [`Self::poll_loads`].
    pub fn request_image(&mut self, index: usize) -> Result<()> {
        if let Err(error) = self.ensure_ready() {
            log::warn!("request for image {index} ignored: {error}");
            return Err(error);
        }
        let loaders = self.loaders.clone().ok_or(ViewerError::NotReady)?;
        if self.image_ids.is_empty() {
            return Err(ViewerError::EmptyStack);
        }
        if index >= self.image_ids.len() {
            return Err(ViewerError::IndexOutOfRange {
                index,
                total: self.image_ids.len(),
            });
        }

        self.next_job_id = self.next_job_id.saturating_add(1);
        self.generation = self.generation.saturating_add(1);
        let (job_id, generation) = (self.next_job_id, self.generation);
        self.active_load = Some(ActiveLoad {
            job_id,
            generation,
            index,
        });

        let image_ids = self.image_ids.clone();
        let tx = self.worker_tx.clone();
        thread::spawn(move || {
            let result = fetch_with_recovery(&loaders, &image_ids, index);
            let _ = tx.send(LoadFinished {
                job_id,
                generation,
                result,
            });
        });
        log::debug!("image {index} requested (job {job_id})");
        Ok(())
    }

    fn is_active_load(&self, job_id: u64, generation: u64) -> bool {
        self.active_load
            .is_some_and(|load| load.job_id == job_id && load.generation == generation)
    }

    fn apply_finished(&mut self, event: LoadFinished) -> bool {
        if self.status != ViewerStatus::Ready || !self.is_active_load(event.job_id, event.generation)
        {
            log::debug!("dropping stale image load (job {})", event.job_id);
            return false;
        }
        self.active_load = None;
        let result = event
            .result
            .and_then(|(index, frame)| self.show(index, frame));
        if let Err(error) = &result {
            self.fail(error);
        }
        true
    }

    /// Applies finished background loads. Returns true when the display changed.
    pub fn poll_loads(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.worker_rx.try_recv() {
            changed |= self.apply_finished(event);
        }
        changed
    }

    /// Blocks until the pending background load is applied or `timeout` passes.
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.active_load.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.worker_rx.recv_timeout(remaining) {
                Ok(event) => {
                    if self.apply_finished(event) {
                        return true;
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
        false
    }

    fn show(&mut self, index: usize, frame: Frame) -> Result<()> {
        let controller = self.controller.as_mut().ok_or(ViewerError::NotReady)?;
        controller.display(Arc::new(frame))?;
        self.index = index;
        self.error = None;
        self.drag = None;
        self.annotations.abort_active();
        self.refresh_viewport();
        log::debug!("viewer `{}` shows image {index}", self.container.id);
        Ok(())
    }

    fn refresh_viewport(&mut self) {
        self.viewport = self
            .controller
            .as_ref()
            .and_then(|controller| controller.viewport());
    }

    fn record(&mut self, action: &str, result: engine::Result<()>) {
        if let Err(error) = result {
            log::error!("{action} failed: {error}");
            self.error = Some(format!("{action} failed: {error}"));
        }
        self.refresh_viewport();
    }

    fn update_viewport(&mut self, action: &str, change: impl FnOnce(&mut Viewport)) {
        if !self.ready_or_warn(action) {
            return;
        }
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let Some(mut viewport) = controller.viewport() else {
            log::warn!("{action} ignored: no image is displayed");
            return;
        };
        change(&mut viewport);
        let result = controller.set_viewport(viewport).map(|_| ());
        self.record(action, result);
    }

    fn with_controller(
        &mut self,
        action: &str,
        call: impl FnOnce(&mut dyn ViewportController) -> engine::Result<()>,
    ) {
        if !self.ready_or_warn(action) {
            return;
        }
        let Some(controller) = self.controller.as_deref_mut() else {
            return;
        };
        let result = call(controller);
        self.record(action, result);
    }

    fn zoom_by(&mut self, factor: f32) {
        let bounds = self.options.scale_bounds;
        self.update_viewport("zoom", |viewport| {
            viewport.scale = bounds.clamp(viewport.scale * factor);
        });
    }

    pub fn toggle_invert(&mut self) {
        self.update_viewport("invert", |viewport| viewport.invert = !viewport.invert);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.container.width = width;
        self.container.height = height;
        if let Some(controller) = self.controller.as_mut() {
            controller.resize(width, height);
        }
    }

    pub fn render(&self) -> Result<RenderedImage> {
        self.ensure_ready()?;
        let controller = self.controller.as_ref().ok_or(ViewerError::NotReady)?;
        Ok(controller.render()?)
    }

    fn canvas_to_image(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        self.controller.as_ref()?.canvas_to_image(x, y)
    }

    fn wwwc_step(&self) -> f32 {
        self.viewport
            .map_or(1.0, |viewport| (viewport.voi.width / 256.0).max(1.0))
    }

    /// Routes pointer input to the tool bound to the pressed button or wheel.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if !self.ready_or_warn("pointer input") {
            return;
        }
        match event {
            PointerEvent::Wheel { steps, ctrl } => self.handle_wheel(steps, ctrl),
            PointerEvent::Press { button, x, y } => {
                let Some(tool) = self
                    .tools
                    .as_ref()
                    .and_then(|tools| tools.active_on(button.binding()))
                else {
                    return;
                };
                self.drag = Some(DragState {
                    button,
                    tool,
                    last: (x, y),
                });
                if let Some(point) = self.canvas_to_image(x, y)
                    && let Some(shape) = Shape::for_tool(tool, point)
                {
                    self.annotations.begin(self.index, shape);
                }
            }
            PointerEvent::Drag { button, x, y } => {
                let Some(mut drag) = self.drag.filter(|drag| drag.button == button) else {
                    return;
                };
                let (dx, dy) = (x - drag.last.0, y - drag.last.1);
                drag.last = (x, y);
                self.drag = Some(drag);
                self.drag_tool(drag.tool, (dx, dy), (x, y));
            }
            PointerEvent::Release { button, x, y } => {
                let Some(drag) = self.drag.filter(|drag| drag.button == button) else {
                    return;
                };
                self.drag = None;
                if !drag.tool.is_annotation() {
                    return;
                }
                if let Some(point) = self.canvas_to_image(x, y) {
                    self.annotations.update_active(point);
                }
                match self.frame() {
                    Some(frame) => {
                        self.annotations.commit(&frame);
                    }
                    None => self.annotations.abort_active(),
                }
            }
        }
    }

    fn drag_tool(&mut self, tool: ToolName, (dx, dy): (f32, f32), (x, y): (f32, f32)) {
        match tool {
            ToolName::Wwwc => {
                let step = self.wwwc_step();
                self.update_viewport("window/level", |viewport| {
                    viewport.voi = WindowLevel::new(
                        viewport.voi.center + dy * step,
                        viewport.voi.width + dx * step,
                    );
                });
            }
            ToolName::Pan => self.update_viewport("pan", |viewport| {
                viewport.translation.0 += dx;
                viewport.translation.1 += dy;
            }),
            ToolName::Zoom => {
                let factor = self.options.zoom_factor.powf(-dy / 20.0);
                self.zoom_by(factor);
            }
            ToolName::Length | ToolName::RectangleRoi | ToolName::EllipticalRoi => {
                if let Some(point) = self.canvas_to_image(x, y) {
                    self.annotations.update_active(point);
                }
            }
            ToolName::ZoomMouseWheel | ToolName::StackScrollMouseWheel => {}
        }
    }

    fn handle_wheel(&mut self, steps: f32, ctrl: bool) {
        let binding = if ctrl { Binding::CtrlWheel } else { Binding::Wheel };
        let forward = steps > 0.0;
        if steps == 0.0 {
            return;
        }
        match self.tools.as_ref().and_then(|tools| tools.active_on(binding)) {
            Some(ToolName::ZoomMouseWheel) if forward => self.zoom_in(),
            Some(ToolName::ZoomMouseWheel) => self.zoom_out(),
            Some(ToolName::StackScrollMouseWheel) if forward => self.next_image(),
            Some(ToolName::StackScrollMouseWheel) => self.previous_image(),
            _ => {}
        }
    }

    /// Index shown once the pending load, if any, lands.
    fn target_index(&self) -> usize {
        self.pending_index().unwrap_or(self.index)
    }

    fn step_to(&mut self, index: usize) -> bool {
        if self.options.background_loads {
            self.request_image(index).is_ok()
        } else {
            self.load_image(index).is_ok()
        }
    }
}

impl ViewerControls for ViewerShell {
    fn set_tool(&mut self, tool: ToolName) {
        if !self.ready_or_warn("tool selection") {
            return;
        }
        let Some(tools) = self.tools.as_mut() else {
            log::warn!("tool selection ignored: tools are not initialized");
            return;
        };
        if !ToolName::PRIMARY.contains(&tool) {
            log::warn!("{tool} cannot be bound to the primary button");
            return;
        }
        for candidate in ToolName::PRIMARY {
            tools.unbind(candidate, Binding::Primary);
        }
        let result = tools.bind(tool, Binding::Primary);
        self.drag = None;
        self.annotations.abort_active();
        self.record("tool selection", result);
        log::debug!("primary tool is now {tool}");
    }

    fn active_tool(&self) -> Option<ToolName> {
        self.tools
            .as_ref()
            .and_then(|tools| tools.active_on(Binding::Primary))
    }

    fn zoom_in(&mut self) {
        self.zoom_by(self.options.zoom_factor);
    }

    fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.options.zoom_factor);
    }

    fn fit_to_window(&mut self) {
        self.with_controller("fit to window", |controller| controller.fit_to_window());
    }

    fn rotate_clockwise(&mut self) {
        self.with_controller("rotate", |controller| {
            let viewport = controller.viewport().ok_or(EngineError::NoImage)?;
            controller.rotate(viewport.rotation.clockwise())
        });
    }

    fn reset(&mut self) {
        self.with_controller("reset", |controller| controller.reset());
    }

    fn set_window_level(&mut self, center: f32, width: f32) {
        self.update_viewport("window/level", |viewport| {
            viewport.voi = WindowLevel { center, width };
        });
    }

    fn play(&mut self) {
        if !self.ready_or_warn("play") {
            return;
        }
        if self.image_ids.len() < 2 {
            log::debug!("play ignored: single image");
            return;
        }
        if Playback::next_index(self.index, self.image_ids.len()).is_none() && !self.step_to(0) {
            return;
        }
        self.playback.start(Instant::now());
    }

    fn pause(&mut self) {
        self.playback.stop();
    }

    fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    fn next_image(&mut self) {
        if let Some(next) = Playback::next_index(self.target_index(), self.image_ids.len()) {
            self.step_to(next);
        }
    }

    fn previous_image(&mut self) {
        if let Some(previous) = self.target_index().checked_sub(1) {
            self.step_to(previous);
        }
    }

    fn seek(&mut self, index: usize) {
        let idle_without_image = self.frame().is_none() && self.pending_index().is_none();
        if index != self.target_index() || idle_without_image {
            self.step_to(index);
        }
    }

    fn tick(&mut self, now: Instant) -> bool {
        if self.status != ViewerStatus::Ready
            || self.active_load.is_some()
            || !self.playback.due(now)
        {
            return false;
        }
        let total = self.image_ids.len();
        let Some(next) = Playback::next_index(self.index, total) else {
            self.playback.stop();
            return false;
        };
        let advanced = self.step_to(next);
        if !advanced || Playback::next_index(next, total).is_none() {
            self.playback.stop();
        }
        advanced
    }

    fn current_index(&self) -> usize {
        self.index
    }

    fn image_count(&self) -> usize {
        self.image_ids.len()
    }

    fn overlay(&self) -> Overlay {
        Overlay {
            zoom_percent: self
                .viewport
                .map_or(100, |viewport| (viewport.scale * 100.0).round() as u32),
            window: self.viewport.map(|viewport| viewport.voi),
            rotation: self
                .viewport
                .map_or(0, |viewport| viewport.rotation.degrees()),
            index: self.index,
            total: self.image_ids.len(),
            playing: self.playback.is_playing(),
            tool: self.active_tool(),
            error: self.error.clone(),
            measurement: self
                .annotations
                .for_image(self.index)
                .last()
                .map(|annotation| annotation.measurement.summary()),
            fallback: false,
        }
    }

    fn unmount(&mut self) {
        if self.status == ViewerStatus::Unmounted {
            return;
        }
        self.generation = self.generation.saturating_add(1);
        self.active_load = None;
        self.playback.stop();
        self.drag = None;
        if let Some(mut controller) = self.controller.take() {
            controller.disable();
        }
        self.tools = None;
        self.loaders = None;
        self.viewport = None;
        self.status = ViewerStatus::Unmounted;
        log::info!("viewer `{}` unmounted", self.container.id);
    }
}

impl Drop for ViewerShell {
    fn drop(&mut self) {
        self.unmount();
    }
}
