use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use eframe::egui;
use rfd::FileDialog;

use crate::engine::{RenderedImage, ToolName};
use crate::quiz::{Phase, QuizSession, Reveal, Tick, TickOutcome, Ticker};
use crate::runtime::AppContext;
use crate::viewer::{CanvasAnnotation, Preset, Shape, ViewerSurface};

use super::canvas;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

pub(super) struct QuizApp {
    context: AppContext,
    session: Option<QuizSession>,
    surface: Option<ViewerSurface>,
    /// Session generation the surface and ticker were set up for.
    mounted_generation: Option<u64>,
    ticker: Option<Ticker>,
    tick_tx: Sender<Tick>,
    tick_rx: Receiver<Tick>,
    texture: Option<egui::TextureHandle>,
    window: (f32, f32),
    status: String,
}

impl QuizApp {
    pub(super) fn new(context: AppContext, bank: Option<PathBuf>) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel();
        let mut app = Self {
            context,
            session: None,
            surface: None,
            mounted_generation: None,
            ticker: None,
            tick_tx,
            tick_rx,
            texture: None,
            window: (40.0, 400.0),
            status: "Open a question bank to start".to_string(),
        };
        if let Some(path) = bank {
            app.open_bank(path);
        }
        app
    }

    fn open_bank(&mut self, path: PathBuf) {
        let quiz = *self.context.quiz_service();
        match quiz.load(&path).and_then(|bank| quiz.start(bank)) {
            Ok(session) => {
                self.status = format!("Loaded {}", path.display());
                self.unmount();
                self.session = Some(session);
            }
            Err(error) => {
                log::error!("could not open {}: {error}", path.display());
                self.status = error.to_string();
            }
        }
    }

    fn pick_bank(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Question bank", &["json", "yaml", "yml"])
            .pick_file()
        {
            self.open_bank(path);
        }
    }

    fn unmount(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.controls_mut().unmount();
        }
        self.ticker = None;
        self.texture = None;
        self.mounted_generation = None;
    }

    /// Remounts the viewer and restarts the countdown whenever the active question changes.
    fn sync_question(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let generation = session.generation();
        if self.mounted_generation == Some(generation) {
            return;
        }
        let image_ids = session
            .current()
            .map(|question| question.image_ids().to_vec());
        self.unmount();
        self.mounted_generation = Some(generation);

        let Some(image_ids) = image_ids else {
            return;
        };
        let surface = self
            .context
            .image_service()
            .mount(&format!("question-{generation}"), image_ids);
        if let Some(window) = surface.controls().overlay().window {
            self.window = (window.center, window.width);
        }
        self.surface = Some(surface);
        self.ticker = Some(Ticker::spawn(
            generation,
            self.context.config().tick_period(),
            self.tick_tx.clone(),
            |tick| tick,
        ));
    }

    fn poll_ticks(&mut self) -> bool {
        let mut changed = false;
        while let Ok(tick) = self.tick_rx.try_recv() {
            let Some(session) = &mut self.session else {
                continue;
            };
            if tick.generation != session.generation() {
                continue;
            }
            changed = true;
            if let TickOutcome::Expired(reveal) = session.tick() {
                self.status = reveal_text(&reveal);
            }
        }
        changed
    }

    fn draw_quiz(&mut self, ui: &mut egui::Ui) {
        let Some(session) = &mut self.session else {
            ui.label("No question bank loaded.");
            return;
        };

        if session.phase() == Phase::Completed {
            let summary = session.summary();
            ui.heading("Quiz complete");
            ui.label(format!(
                "Score {} ({})",
                summary.score_label, summary.percent_label
            ));
            for (index, outcome) in summary.questions.iter().enumerate() {
                let mark = match (outcome.correct, outcome.timed_out) {
                    (true, _) => "correct",
                    (false, true) => "timed out",
                    (false, false) => "incorrect",
                };
                ui.label(format!("{}. {} - {mark}", index + 1, outcome.id));
            }
            if ui.button("Restart").clicked() {
                session.restart();
            }
            return;
        }

        let Some(question) = session.current().cloned() else {
            return;
        };
        ui.heading(format!("Question {} of {}", session.index() + 1, session.total()));
        ui.label(format!("{:?} | {}", question.difficulty, question.category));
        let countdown = session.countdown();
        ui.add(egui::ProgressBar::new(countdown.fraction_remaining()).text(countdown.label()));
        ui.separator();
        ui.label(egui::RichText::new(&question.prompt).strong());

        let info = &question.image_info;
        if !info.modality.is_empty() {
            ui.small(format!("{} {}", info.modality, info.body_part));
        }

        let answering = session.phase() == Phase::Answering;
        let reveal = session.reveal();
        for (index, option) in question.options.iter().enumerate() {
            let mut text = egui::RichText::new(option);
            if let Some(reveal) = &reveal {
                if index == reveal.correct_option {
                    text = text.color(egui::Color32::LIGHT_GREEN);
                } else if Some(index) == reveal.selected {
                    text = text.color(egui::Color32::LIGHT_RED);
                }
            }
            let checked = session.selected() == Some(index);
            if ui
                .add_enabled(answering, egui::RadioButton::new(checked, text))
                .clicked()
                && let Err(error) = session.select_option(index)
            {
                self.status = error.to_string();
            }
        }

        ui.horizontal(|ui| {
            if ui
                .add_enabled(answering && session.selected().is_some(), egui::Button::new("Submit"))
                .clicked()
            {
                match session.submit() {
                    Ok(reveal) => self.status = reveal_text(&reveal),
                    Err(error) => self.status = error.to_string(),
                }
            }
            if ui
                .add_enabled(session.index() > 0, egui::Button::new("Previous"))
                .clicked()
                && let Err(error) = session.previous()
            {
                self.status = error.to_string();
            }
            if ui
                .add_enabled(!answering, egui::Button::new("Next"))
                .clicked()
                && let Err(error) = session.next()
            {
                self.status = error.to_string();
            }
            if ui.button("Restart").clicked() {
                session.restart();
            }
        });

        if let Some(reveal) = &reveal {
            ui.separator();
            ui.label(reveal_text(reveal));
            if !info.findings.is_empty() {
                ui.small(format!("Findings: {}", info.findings.join(", ")));
            }
        }
        ui.separator();
        ui.label(format!("Score {}/{}", session.score(), session.total()));
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        let Some(surface) = &mut self.surface else {
            return;
        };
        let controls = surface.controls_mut();
        let typed = ui.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Text(text) => text.chars().next(),
                    _ => None,
                })
                .collect::<Vec<_>>()
        });
        for key in typed {
            if let Some(tool) = ToolName::PRIMARY
                .into_iter()
                .find(|tool| tool.shortcut() == Some(key))
            {
                controls.set_tool(tool);
            }
        }

        ui.horizontal_wrapped(|ui| {
            let active = controls.active_tool();
            for tool in ToolName::PRIMARY {
                let mut response = ui.selectable_label(active == Some(tool), tool.label());
                if let Some(key) = tool.shortcut() {
                    response = response.on_hover_text(format!("Key: {key}"));
                }
                if response.clicked() {
                    controls.set_tool(tool);
                }
            }
            ui.separator();
            if ui.button("Zoom +").clicked() {
                controls.zoom_in();
            }
            if ui.button("Zoom -").clicked() {
                controls.zoom_out();
            }
            if ui.button("Fit").clicked() {
                controls.fit_to_window();
            }
            if ui.button("Rotate").clicked() {
                controls.rotate_clockwise();
            }
            if ui.button("Reset").clicked() {
                controls.reset();
            }
        });

        ui.horizontal_wrapped(|ui| {
            let label = if controls.is_playing() { "Pause" } else { "Play" };
            if ui.button(label).clicked() {
                controls.toggle_playback();
            }
            if ui.button("<").clicked() {
                controls.previous_image();
            }
            if ui.button(">").clicked() {
                controls.next_image();
            }
            let count = controls.image_count();
            if count > 1 {
                let mut index = controls.current_index();
                if ui
                    .add(egui::Slider::new(&mut index, 0..=count - 1).text("Image"))
                    .changed()
                {
                    controls.seek(index);
                }
            }
        });

        ui.horizontal_wrapped(|ui| {
            let (center, width) = &mut self.window;
            let center_changed = ui
                .add(egui::Slider::new(center, -1024.0..=3071.0).text("Level"))
                .changed();
            let width_changed = ui
                .add(egui::Slider::new(width, 1.0..=4096.0).text("Window"))
                .changed();
            if center_changed || width_changed {
                controls.set_window_level(*center, *width);
            }
            for preset in Preset::ALL {
                if ui.button(preset.to_string()).clicked() {
                    controls.apply_preset(preset);
                }
            }
        });
        if let Some(window) = controls.overlay().window {
            self.window = (window.center, window.width);
        }
    }

    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let Some(surface) = &mut self.surface else {
            return;
        };
        if let Some(reason) = surface.fallback_reason() {
            ui.colored_label(
                egui::Color32::YELLOW,
                format!("Image viewer unavailable: {reason}"),
            );
        }

        if let Some(shell) = surface.shell_mut()
            && !shell.annotations().all().is_empty()
        {
            ui.horizontal(|ui| {
                if ui.button("Delete measurement").clicked() {
                    shell.remove_selected_annotation();
                }
                if ui.button("Clear measurements").clicked() {
                    shell.clear_annotations();
                }
            });
        }

        let size = ui.available_size().max(egui::vec2(64.0, 64.0));
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        surface.resize(rect.width() as u32, rect.height() as u32);
        for event in canvas::pointer_events(ui, &response) {
            surface.handle_pointer(event);
        }

        ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
        match surface.render() {
            Some(image) => {
                let color = to_color_image(&image);
                match &mut self.texture {
                    Some(texture) => texture.set(color, egui::TextureOptions::NEAREST),
                    None => {
                        self.texture = Some(ui.ctx().load_texture(
                            "viewer-texture",
                            color,
                            egui::TextureOptions::NEAREST,
                        ));
                    }
                }
                if let Some(texture) = &self.texture {
                    let image_rect = egui::Rect::from_min_size(
                        rect.min,
                        egui::vec2(image.width as f32, image.height as f32),
                    );
                    ui.painter().image(
                        texture.id(),
                        image_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
            }
            None => self.texture = None,
        }

        if let Some(shell) = surface.shell() {
            for annotation in shell.canvas_annotations() {
                paint_annotation(ui.painter(), rect.min, &annotation);
            }
        }

        let overlay = surface.controls().overlay();
        ui.painter().text(
            rect.left_bottom() + egui::vec2(6.0, -6.0),
            egui::Align2::LEFT_BOTTOM,
            overlay.to_string(),
            egui::FontId::monospace(12.0),
            egui::Color32::WHITE,
        );
    }
}

fn reveal_text(reveal: &Reveal) -> String {
    let verdict = match (reveal.correct, reveal.selected) {
        (true, _) => "Correct.",
        (false, None) => "Time is up.",
        (false, Some(_)) => "Incorrect.",
    };
    format!(
        "{verdict} The answer is option {}. {}",
        reveal.correct_option + 1,
        reveal.explanation
    )
}

const ELLIPSE_SEGMENTS: usize = 48;

fn paint_annotation(painter: &egui::Painter, origin: egui::Pos2, annotation: &CanvasAnnotation) {
    let color = if annotation.selected {
        egui::Color32::YELLOW
    } else {
        egui::Color32::LIGHT_GREEN
    };
    let stroke = egui::Stroke::new(1.5, color);
    let ((x0, y0), (x1, y1)) = annotation.shape.endpoints();
    let (start, end) = (origin + egui::vec2(x0, y0), origin + egui::vec2(x1, y1));
    let bounds = egui::Rect::from_two_pos(start, end);
    match annotation.shape {
        Shape::Length { .. } => {
            painter.line_segment([start, end], stroke);
        }
        Shape::Rectangle { .. } => {
            let corners = vec![
                bounds.left_top(),
                bounds.right_top(),
                bounds.right_bottom(),
                bounds.left_bottom(),
            ];
            painter.add(egui::Shape::closed_line(corners, stroke));
        }
        Shape::Ellipse { .. } => {
            let (center, radius) = (bounds.center(), bounds.size() * 0.5);
            let points = (0..ELLIPSE_SEGMENTS)
                .map(|step| {
                    let angle = step as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
                    center + egui::vec2(radius.x * angle.cos(), radius.y * angle.sin())
                })
                .collect();
            painter.add(egui::Shape::closed_line(points, stroke));
        }
    }
    if let Some(label) = &annotation.label {
        painter.text(
            end + egui::vec2(4.0, 4.0),
            egui::Align2::LEFT_TOP,
            label,
            egui::FontId::proportional(12.0),
            color,
        );
    }
}

fn to_color_image(image: &RenderedImage) -> egui::ColorImage {
    egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.to_rgba())
}

impl eframe::App for QuizApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_question();
        let ticked = self.poll_ticks();
        if let Some(surface) = &mut self.surface {
            surface.poll_loads();
            surface.controls_mut().tick(Instant::now());
        }

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open bank...").clicked() {
                    self.pick_bank();
                }
                if let Some(title) = self
                    .session
                    .as_ref()
                    .and_then(|session| session.bank().title.clone())
                {
                    ui.strong(title);
                }
                ui.separator();
                ui.label(&self.status);
            });
        });
        egui::SidePanel::right("quiz")
            .min_width(320.0)
            .show(ctx, |ui| self.draw_quiz(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_toolbar(ui);
            ui.separator();
            self.draw_canvas(ui);
        });

        let playing = self
            .surface
            .as_ref()
            .is_some_and(|surface| surface.controls().is_playing());
        if ticked {
            ctx.request_repaint();
        } else if self.ticker.is_some() || playing {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }
}

impl Drop for QuizApp {
    fn drop(&mut self) {
        self.unmount();
    }
}
