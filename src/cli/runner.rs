use std::path::Path;

use clap::Parser;
use serde::Serialize;

use crate::config::AppConfig;
use crate::runtime::{AppContext, RenderRequest};

use super::interactive;
use super::types::{Cli, Commands};

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { image_id, config } => {
            let app = context(config.as_deref())?;
            let report = app
                .image_service()
                .inspect(&image_id)
                .map_err(|error| error.to_string())?;
            print_json(&report)?;
        }
        Commands::Render {
            image_id,
            output,
            preset,
            window,
            zoom_steps,
            rotate,
            invert,
            width,
            height,
            config,
        } => {
            let app = context(config.as_deref())?;
            let request = RenderRequest {
                image_id,
                preset,
                window,
                zoom_steps,
                rotate_degrees: rotate,
                invert,
                width,
                height,
            };
            let report = app
                .image_service()
                .render_to_file(&request, &output)
                .map_err(|error| error.to_string())?;
            print_json(&report)?;
        }
        Commands::Quiz {
            bank,
            answers,
            config,
        } => {
            let app = context(config.as_deref())?;
            let quiz = app.quiz_service();
            let bank = quiz.load(&bank).map_err(|error| error.to_string())?;
            let summary = match answers {
                Some(answers) => quiz
                    .run_scripted(bank, &answers.0)
                    .map_err(|error| error.to_string())?,
                None => {
                    let session = quiz.start(bank).map_err(|error| error.to_string())?;
                    interactive::run(session, app.config().tick_period())
                        .map_err(|error| error.to_string())?
                }
            };
            print_json(&summary)?;
        }
        Commands::Check { bank } => {
            let app = AppContext::new();
            let report = app
                .quiz_service()
                .check(&bank)
                .map_err(|error| error.to_string())?;
            print_json(&report)?;
        }
        Commands::View { bank, config } => {
            let app = context(config.as_deref())?;
            crate::ui::run_with(app, bank)?;
        }
    }

    Ok(())
}

fn context(config: Option<&Path>) -> Result<AppContext, String> {
    let config = AppConfig::load_or_default(config).map_err(|error| error.to_string())?;
    Ok(AppContext::with_config(config))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())?
    );
    Ok(())
}
