use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::viewer::Preset;

#[derive(Debug, Parser)]
#[command(
    name = "radquiz",
    version,
    about = "Radiology image viewer and timed image quiz"
)]
pub(super) struct Cli {
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Loads an image identifier and prints its frame metadata.
    Inspect {
        image_id: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Renders an image headlessly through the viewer pipeline into a PNG.
    Render {
        image_id: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_preset)]
        preset: Option<Preset>,
        /// Window as `center,width`.
        #[arg(long, value_parser = parse_window, allow_hyphen_values = true)]
        window: Option<(f32, f32)>,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        zoom_steps: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        rotate: i32,
        #[arg(long)]
        invert: bool,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Runs a quiz in the terminal and prints the summary.
    Quiz {
        #[arg(long)]
        bank: PathBuf,
        /// Scripted answers, e.g. `0,-,2`; `-` lets the timer run out.
        #[arg(long, value_parser = parse_answers)]
        answers: Option<Answers>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validates a question bank.
    Check { bank: PathBuf },
    /// Launches the native quiz window.
    View {
        #[arg(long)]
        bank: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Answers(pub(super) Vec<Option<usize>>);

pub(super) fn parse_answers(raw: &str) -> Result<Answers, String> {
    raw.split(',')
        .map(str::trim)
        .map(|answer| match answer {
            "-" | "" => Ok(None),
            index => index
                .parse::<usize>()
                .map(Some)
                .map_err(|_| format!("answer `{index}` is neither an option index nor `-`")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Answers)
}

pub(super) fn parse_preset(raw: &str) -> Result<Preset, String> {
    raw.parse::<Preset>().map_err(|error| error.to_string())
}

pub(super) fn parse_window(raw: &str) -> Result<(f32, f32), String> {
    let (center, width) = raw
        .split_once(',')
        .ok_or_else(|| format!("window `{raw}` must be `center,width`"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f32>()
            .map_err(|error| format!("window value `{value}`: {error}"))
    };
    Ok((parse(center)?, parse(width)?))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Answers, Cli, Commands, parse_answers, parse_window};
    use crate::viewer::Preset;

    #[test]
    fn answers_accept_indices_and_timeouts() {
        assert_eq!(
            parse_answers("0,-,2").expect("answers"),
            Answers(vec![Some(0), None, Some(2)])
        );
        assert!(parse_answers("0,x").is_err());
    }

    #[test]
    fn window_parses_center_and_width() {
        assert_eq!(parse_window("-600,1500").expect("window"), (-600.0, 1500.0));
        assert!(parse_window("40").is_err());
    }

    #[test]
    fn render_arguments_parse() {
        let cli = Cli::try_parse_from([
            "radquiz",
            "render",
            "https://example.org/a.png",
            "--output",
            "out.png",
            "--preset",
            "lung",
            "--zoom-steps",
            "-2",
            "--rotate",
            "90",
        ])
        .expect("parse");
        let Commands::Render {
            preset,
            zoom_steps,
            rotate,
            ..
        } = cli.command
        else {
            panic!("expected render");
        };
        assert_eq!(preset, Some(Preset::Lung));
        assert_eq!(zoom_steps, -2);
        assert_eq!(rotate, 90);
    }
}
