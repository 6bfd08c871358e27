use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ndarray::Array2;

use super::{
    FallbackViewer, PointerButton, PointerEvent, Preset, Shape, ViewerControls, ViewerError,
    ViewerOptions, ViewerShell, ViewerStatus, ViewerSurface,
};
use crate::engine::{
    Binding, Capabilities, Container, ImagingRuntime, ModuleLoader, ModuleSpec, RuntimeBootstrap,
    RuntimeOptions, ScaleBounds, ToolName,
};
use crate::loader::{ImageId, ImageLoader, LoadError, LoaderRegistry, Result as LoadResult};
use crate::model::{Frame, PixelType};

/// Serves `mem:ok/<n>` as a 4x4 ramp offset by `n` and fails `mem:bad/<n>`.
#[derive(Default)]
struct MemLoader {
    calls: AtomicUsize,
}

fn ramp(offset: f32) -> Frame {
    let data = Array2::from_shape_fn((4, 4), |(row, column)| {
        (row * 4 + column) as f32 * 10.0 + offset
    });
    Frame::from_data(data, PixelType::U16).expect("frame")
}

impl ImageLoader for MemLoader {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["mem"]
    }

    fn load(&self, id: &ImageId) -> LoadResult<Frame> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match id.location().split_once('/') {
            Some(("ok", offset)) => Ok(ramp(offset.parse().unwrap_or_default())),
            _ => Err(LoadError::InvalidIdentifier(id.raw().to_string())),
        }
    }
}

/// Blocks every load until the test releases it.
struct GatedLoader {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl ImageLoader for GatedLoader {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["gated"]
    }

    fn load(&self, _id: &ImageId) -> LoadResult<Frame> {
        let _ = self.started.lock().expect("lock").send(());
        let _ = self.release.lock().expect("lock").recv();
        Ok(ramp(0.0))
    }
}

fn runtime_with(loader: Arc<dyn ImageLoader>) -> ImagingRuntime {
    let mut loaders = LoaderRegistry::new();
    loaders.register(loader).expect("register");
    let capabilities = Capabilities {
        engine: true,
        tools: true,
    };
    ImagingRuntime::new(capabilities, loaders, ScaleBounds::default())
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|id| id.to_string()).collect()
}

fn mounted(raw: &[&str]) -> (ViewerShell, Arc<MemLoader>) {
    let loader = Arc::new(MemLoader::default());
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(raw),
        ViewerOptions::default(),
    );
    shell.attach(&runtime_with(loader.clone())).expect("attach");
    (shell, loader)
}

fn scale(shell: &ViewerShell) -> f32 {
    shell.viewport().expect("viewport").scale
}

#[test]
fn first_slot_failure_retries_second_image_exactly_once() {
    let (shell, loader) = mounted(&["mem:bad/0", "mem:bad/1", "mem:ok/2"]);

    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(shell.status(), ViewerStatus::Ready);
    assert!(shell.frame().is_none());
    assert!(shell.error().is_some_and(|error| error.contains("image 1")));
}

#[test]
fn first_slot_failure_recovers_with_second_image() {
    let (shell, loader) = mounted(&["mem:bad/0", "mem:ok/1"]);

    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(shell.current_index(), 1);
    assert_eq!(shell.error(), None);
    assert_eq!(shell.overlay().position(), "2/2");
}

#[test]
fn later_slot_failure_is_an_inline_error_without_retry() {
    let (mut shell, loader) = mounted(&["mem:ok/0", "mem:bad/1", "mem:ok/2"]);

    assert!(matches!(
        shell.load_image(1),
        Err(ViewerError::ImageLoad { index: 1, .. })
    ));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(shell.current_index(), 0);
    assert!(shell.overlay().error.is_some());

    shell.load_image(2).expect("load");
    assert_eq!(shell.error(), None);
}

#[test]
fn three_zoom_ins_from_unit_scale() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);
    assert_eq!(scale(&shell), 1.0);

    for _ in 0..3 {
        shell.zoom_in();
    }
    assert!((scale(&shell) - 1.953_125).abs() < 1e-4);
    assert_eq!(shell.overlay().zoom_percent, 195);

    shell.zoom_out();
    shell.zoom_in();
    assert!((scale(&shell) - 1.953_125).abs() < 1e-4);

    for _ in 0..20 {
        shell.zoom_in();
    }
    assert_eq!(scale(&shell), 10.0);
    for _ in 0..40 {
        shell.zoom_out();
    }
    assert_eq!(scale(&shell), 0.1);
}

#[test]
fn set_tool_leaves_exactly_one_primary_tool() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);
    assert_eq!(shell.active_tool(), Some(ToolName::Wwwc));

    shell.set_tool(ToolName::Pan);
    shell.set_tool(ToolName::Zoom);
    assert_eq!(shell.tools_on(Binding::Primary), vec![ToolName::Zoom]);
    assert_eq!(shell.tools_on(Binding::Secondary), vec![ToolName::Zoom]);
    assert_eq!(
        shell.tools_on(Binding::Wheel),
        vec![ToolName::StackScrollMouseWheel]
    );
    assert_eq!(
        shell.tools_on(Binding::CtrlWheel),
        vec![ToolName::ZoomMouseWheel]
    );

    shell.set_tool(ToolName::StackScrollMouseWheel);
    assert_eq!(shell.active_tool(), Some(ToolName::Zoom));
}

#[test]
fn controls_are_guarded_before_initialization() {
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(&["mem:ok/0"]),
        ViewerOptions::default(),
    );

    shell.set_tool(ToolName::Pan);
    shell.zoom_in();
    shell.rotate_clockwise();
    shell.handle_pointer(PointerEvent::Wheel {
        steps: 1.0,
        ctrl: true,
    });

    assert_eq!(shell.status(), ViewerStatus::Uninitialized);
    assert_eq!(shell.active_tool(), None);
    assert!(shell.viewport().is_none());
    assert!(matches!(shell.load_image(0), Err(ViewerError::NotReady)));
    assert!(shell.render().is_err());
}

#[test]
fn missing_tools_capability_degrades_the_shell() {
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(&["mem:ok/0"]),
        ViewerOptions::default(),
    );
    let runtime = ImagingRuntime::new(
        Capabilities {
            engine: true,
            tools: false,
        },
        LoaderRegistry::new(),
        ScaleBounds::default(),
    );

    assert!(shell.attach(&runtime).is_err());
    assert_eq!(shell.status(), ViewerStatus::Degraded);
    assert!(shell.error().is_some());
}

#[test]
fn presets_and_manual_window_share_one_path() {
    let (mut shell, _) = mounted(&["mem:ok/0", "mem:ok/1", "mem:ok/2"]);

    shell.apply_preset(Preset::Lung);
    let window = shell.overlay().window.expect("window");
    assert_eq!((window.center, window.width), (-600.0, 1500.0));

    shell.set_window_level(40.0, 0.0);
    let window = shell.overlay().window.expect("window");
    assert_eq!((window.center, window.width), (40.0, 1.0));

    shell.set_window_level(f32::NAN, 10.0);
    assert!(shell.error().is_some_and(|error| error.contains("window/level")));
    assert_eq!(shell.overlay().window.expect("window").center, 40.0);
    assert_eq!(shell.overlay().position(), "1/3");
}

#[test]
fn rotate_and_reset_are_reread_from_the_viewport() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);

    shell.rotate_clockwise();
    shell.rotate_clockwise();
    assert_eq!(shell.overlay().rotation, 180);

    shell.zoom_in();
    shell.reset();
    assert_eq!(shell.overlay().rotation, 0);
    assert_eq!(scale(&shell), 1.0);

    shell.zoom_in();
    shell.fit_to_window();
    assert_eq!(scale(&shell), 1.0);
}

#[test]
fn playback_advances_and_stops_at_the_last_image() {
    let (mut shell, _) = mounted(&["mem:ok/0", "mem:ok/1", "mem:ok/2"]);
    let interval = ViewerOptions::default().playback_interval;
    let start = Instant::now();

    shell.play();
    assert!(shell.is_playing());
    assert!(!shell.tick(start));

    assert!(shell.tick(start + interval * 2));
    assert_eq!(shell.current_index(), 1);
    assert!(shell.tick(start + interval * 4));
    assert_eq!(shell.current_index(), 2);
    assert!(!shell.is_playing());
    assert!(!shell.tick(start + interval * 6));

    shell.play();
    assert_eq!(shell.current_index(), 0);
    assert!(shell.is_playing());
}

#[test]
fn seek_does_not_pause_playback() {
    let (mut shell, _) = mounted(&["mem:ok/0", "mem:ok/1", "mem:ok/2", "mem:ok/3"]);

    shell.play();
    shell.seek(2);
    assert_eq!(shell.current_index(), 2);
    assert!(shell.is_playing());

    shell.pause();
    assert!(!shell.is_playing());
    shell.seek(9);
    assert_eq!(shell.current_index(), 2);
    assert!(shell.error().is_some());
}

#[test]
fn wheel_scrolls_the_stack_and_ctrl_wheel_zooms() {
    let (mut shell, _) = mounted(&["mem:ok/0", "mem:ok/1"]);

    shell.handle_pointer(PointerEvent::Wheel {
        steps: 1.0,
        ctrl: false,
    });
    assert_eq!(shell.current_index(), 1);
    shell.handle_pointer(PointerEvent::Wheel {
        steps: 1.0,
        ctrl: false,
    });
    assert_eq!(shell.current_index(), 1);

    shell.handle_pointer(PointerEvent::Wheel {
        steps: 1.0,
        ctrl: true,
    });
    assert!((scale(&shell) - 1.25).abs() < 1e-6);
    shell.handle_pointer(PointerEvent::Wheel {
        steps: -1.0,
        ctrl: false,
    });
    assert_eq!(shell.current_index(), 0);
    assert!((scale(&shell) - 1.25).abs() < 1e-6);
}

#[test]
fn drags_follow_the_bound_tool() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);
    let before = shell.viewport().expect("viewport").voi;

    shell.handle_pointer(PointerEvent::Press {
        button: PointerButton::Primary,
        x: 1.0,
        y: 1.0,
    });
    shell.handle_pointer(PointerEvent::Drag {
        button: PointerButton::Primary,
        x: 11.0,
        y: -4.0,
    });
    shell.handle_pointer(PointerEvent::Release {
        button: PointerButton::Primary,
        x: 11.0,
        y: -4.0,
    });
    let after = shell.viewport().expect("viewport").voi;
    assert_eq!(after.width, before.width + 10.0);
    assert_eq!(after.center, before.center - 5.0);

    shell.set_tool(ToolName::Pan);
    shell.handle_pointer(PointerEvent::Press {
        button: PointerButton::Primary,
        x: 0.0,
        y: 0.0,
    });
    shell.handle_pointer(PointerEvent::Drag {
        button: PointerButton::Primary,
        x: 3.0,
        y: 2.0,
    });
    assert_eq!(shell.viewport().expect("viewport").translation, (3.0, 2.0));
}

#[test]
fn length_tool_records_a_measurement() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);
    shell.set_tool(ToolName::Length);

    shell.handle_pointer(PointerEvent::Press {
        button: PointerButton::Primary,
        x: 0.0,
        y: 0.0,
    });
    shell.handle_pointer(PointerEvent::Drag {
        button: PointerButton::Primary,
        x: 3.0,
        y: 0.0,
    });
    shell.handle_pointer(PointerEvent::Release {
        button: PointerButton::Primary,
        x: 3.0,
        y: 4.0,
    });

    let annotations = shell.annotations().all();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].image_index, 0);
    assert_eq!(annotations[0].measurement.length, Some(5.0));

    assert_eq!(shell.overlay().measurement.as_deref(), Some("5.0 px"));
    assert!(shell.overlay().to_string().ends_with("| 5.0 px"));
    let drawn = shell.canvas_annotations();
    assert_eq!(drawn.len(), 1);
    assert!(matches!(drawn[0].shape, Shape::Length { .. }));
    assert_eq!(drawn[0].label.as_deref(), Some("5.0 px"));
    assert!(drawn[0].selected);

    assert!(shell.remove_selected_annotation());
    assert!(shell.canvas_annotations().is_empty());
    assert_eq!(shell.overlay().measurement, None);
}

#[test]
fn annotations_in_progress_are_drawn_without_a_label() {
    let (mut shell, _) = mounted(&["mem:ok/0"]);
    shell.set_tool(ToolName::RectangleRoi);
    shell.handle_pointer(PointerEvent::Press {
        button: PointerButton::Primary,
        x: 0.0,
        y: 0.0,
    });
    shell.handle_pointer(PointerEvent::Drag {
        button: PointerButton::Primary,
        x: 2.0,
        y: 2.0,
    });

    let drawn = shell.canvas_annotations();
    assert_eq!(drawn.len(), 1);
    assert!(matches!(drawn[0].shape, Shape::Rectangle { .. }));
    assert_eq!(drawn[0].label, None);

    shell.clear_annotations();
    assert!(shell.canvas_annotations().is_empty());
}

#[test]
fn stale_background_loads_are_dropped() {
    let (mut shell, _) = mounted(&["mem:ok/0", "mem:ok/1", "mem:ok/2"]);

    shell.request_image(1).expect("request");
    shell.request_image(2).expect("request");
    assert_eq!(shell.pending_index(), Some(2));
    assert!(shell.wait_for_load(Duration::from_secs(5)));
    assert_eq!(shell.current_index(), 2);
    assert_eq!(shell.pending_index(), None);

    assert!(matches!(
        shell.request_image(7),
        Err(ViewerError::IndexOutOfRange { index: 7, total: 3 })
    ));
}

#[test]
fn unmount_ignores_loads_that_finish_afterwards() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = Arc::new(GatedLoader {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(&["gated:a", "gated:b"]),
        ViewerOptions::default(),
    );
    release_tx.send(()).expect("release first load");
    shell.attach(&runtime_with(loader)).expect("attach");
    started_rx.recv().expect("first load started");

    shell.request_image(1).expect("request");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("background load started");
    shell.unmount();
    release_tx.send(()).expect("release background load");
    std::thread::sleep(Duration::from_millis(50));

    assert!(!shell.poll_loads());
    assert_eq!(shell.status(), ViewerStatus::Unmounted);
    assert!(shell.frame().is_none());
    assert_eq!(shell.current_index(), 0);
    assert!(matches!(shell.load_image(1), Err(ViewerError::Unmounted)));
    shell.zoom_in();
    assert!(shell.viewport().is_none());
}

fn background_options() -> ViewerOptions {
    ViewerOptions {
        background_loads: true,
        ..ViewerOptions::default()
    }
}

fn poll_until_changed(surface: &mut ViewerSurface) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if surface.poll_loads() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn background_loads_keep_the_mounted_viewer_responsive() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let loader = Arc::new(GatedLoader {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(&["gated:a", "gated:b"]),
        background_options(),
    );
    shell.attach(&runtime_with(loader)).expect("attach");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("first load started");
    assert_eq!(shell.pending_index(), Some(0));

    let mut surface = ViewerSurface::Live(Box::new(shell));
    let controls = surface.controls_mut();
    controls.set_tool(ToolName::Pan);
    controls.zoom_in();
    assert_eq!(controls.active_tool(), Some(ToolName::Pan));
    assert_eq!(controls.overlay().position(), "1/2");
    assert!(surface.render().is_none());
    assert!(!surface.poll_loads());

    release_tx.send(()).expect("release first load");
    assert!(poll_until_changed(&mut surface));
    assert!(surface.render().is_some());

    surface.controls_mut().next_image();
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("second load started");
    assert_eq!(surface.controls().current_index(), 0);
    surface.controls_mut().next_image();

    release_tx.send(()).expect("release second load");
    assert!(poll_until_changed(&mut surface));
    assert_eq!(surface.controls().current_index(), 1);
    assert_eq!(surface.shell().and_then(ViewerShell::pending_index), None);
}

#[test]
fn background_first_slot_failure_still_retries_once() {
    let loader = Arc::new(MemLoader::default());
    let mut shell = ViewerShell::new(
        Container::new("viewer", 4, 4),
        ids(&["mem:bad/0", "mem:ok/1"]),
        background_options(),
    );
    shell.attach(&runtime_with(loader.clone())).expect("attach");

    assert!(shell.wait_for_load(Duration::from_secs(5)));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(shell.current_index(), 1);
    assert_eq!(shell.error(), None);
}

#[test]
fn empty_stack_loads_report_an_empty_stack() {
    let (mut shell, loader) = mounted(&[]);
    assert!(matches!(shell.load_image(0), Err(ViewerError::EmptyStack)));
    assert!(matches!(shell.request_image(0), Err(ViewerError::EmptyStack)));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(shell.overlay().position(), "0/0");
}

#[test]
fn failed_bootstrap_mounts_the_fallback() {
    let mut modules = ModuleSpec::default_manifest();
    modules.insert(0, ModuleSpec::required("volume-renderer"));
    let bootstrap = RuntimeBootstrap::new(
        Arc::new(ModuleLoader::new()),
        modules,
        RuntimeOptions::default(),
    );

    let mut surface = ViewerSurface::mount(
        Container::new("viewer", 64, 64),
        ids(&["a.png", "b.png"]),
        ViewerOptions::default(),
        &bootstrap,
    );
    assert!(surface.is_fallback());
    assert!(
        surface
            .fallback_reason()
            .is_some_and(|reason| reason.contains("volume-renderer"))
    );
    assert!(surface.render().is_none());

    let controls = surface.controls_mut();
    controls.zoom_in();
    controls.set_tool(ToolName::EllipticalRoi);
    controls.next_image();
    let overlay = controls.overlay();
    assert!(overlay.fallback);
    assert_eq!(overlay.zoom_percent, 125);
    assert_eq!(overlay.tool, Some(ToolName::EllipticalRoi));
    assert_eq!(overlay.position(), "2/2");
}

#[test]
fn successful_bootstrap_mounts_the_live_viewer() {
    let bootstrap = RuntimeBootstrap::new(
        Arc::new(ModuleLoader::new()),
        ModuleSpec::default_manifest(),
        RuntimeOptions::default(),
    );
    let surface = ViewerSurface::mount(
        Container::new("viewer", 64, 64),
        Vec::new(),
        ViewerOptions::default(),
        &bootstrap,
    );

    assert!(!surface.is_fallback());
    let shell = surface.shell().expect("live shell");
    assert_eq!(shell.status(), ViewerStatus::Ready);
    assert_eq!(surface.controls().overlay().position(), "0/0");
}

#[test]
fn fallback_controls_only_touch_local_state() {
    let mut fallback = FallbackViewer::new(
        ids(&["a", "b", "c"]),
        "engine missing",
        ViewerOptions::default(),
    );

    fallback.apply_preset(Preset::Bone);
    fallback.seek(5);
    fallback.rotate_clockwise();
    let overlay = fallback.overlay();
    assert_eq!(overlay.window.map(|window| window.center), Some(300.0));
    assert_eq!(overlay.index, 0);
    assert_eq!(overlay.rotation, 90);

    let start = Instant::now();
    fallback.seek(1);
    fallback.play();
    assert!(fallback.tick(start + Duration::from_secs(1)));
    assert_eq!(fallback.current_index(), 2);
    assert!(!fallback.is_playing());

    fallback.unmount();
    assert!(!fallback.is_mounted());
}
