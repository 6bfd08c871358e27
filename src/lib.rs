pub mod cli;
pub mod config;
pub mod engine;
pub mod formats;
pub mod loader;
pub mod model;
pub mod quiz;
pub mod runtime;
pub mod ui;
pub mod viewer;

pub fn run_cli() -> Result<(), String> {
    cli::run_cli()
}
