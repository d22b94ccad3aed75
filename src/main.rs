use std::process::ExitCode;

use clap::Parser;
use log::error;

use ppe_monitor::cli::AppArgs;
use ppe_monitor::{app, logging};

fn main() -> ExitCode {
    logging::init();

    let args = AppArgs::parse();
    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
