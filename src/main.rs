//! Main entry point for tablebridge CLI

use clap::Parser;
use tablebridge::cli::Cli;
use tablebridge::commands::execute_command;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(e) = execute_command(cli.command, cli.config.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
