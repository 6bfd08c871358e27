mod app;
mod canvas;

use std::path::PathBuf;

use eframe::egui;

use crate::runtime::AppContext;

use app::QuizApp;

const WINDOW_SIZE: [f32; 2] = [1200.0, 800.0];

/// Opens the quiz window with default configuration.
pub fn run(bank: Option<PathBuf>) -> Result<(), String> {
    run_with(AppContext::new(), bank)
}

pub fn run_with(context: AppContext, bank: Option<PathBuf>) -> Result<(), String> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("radquiz")
            .with_inner_size(WINDOW_SIZE)
            .with_min_inner_size([800.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "radquiz",
        options,
        Box::new(move |_cc| Ok(Box::new(QuizApp::new(context, bank)))),
    )
    .map_err(|error| error.to_string())
}
