mod app;
mod catalogue;
mod checksum;
mod config;
mod db;
mod engine;
mod error;
mod event;
mod logger;
mod output;
mod preservability;
mod rename;
mod siegfried;

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use app::Cli;
use logger::Logger;

static LOGGER: Logger = Logger {};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level: LevelFilter = cli.verbose.log_level_filter();
    log::set_logger(&LOGGER).expect("logger should only be installed once");
    log::set_max_level(level);

    match app::run(cli) {
        Ok(()) => {
            if Logger::has_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
