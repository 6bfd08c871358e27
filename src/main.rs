#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    pretty_env_logger::init();

    let result = if std::env::args_os().count() <= 1 {
        radquiz::ui::run(None)
    } else {
        radquiz::run_cli()
    };

    if let Err(error) = result {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
