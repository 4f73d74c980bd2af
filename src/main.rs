use clap::Parser;
use dirsort::cli::{Cli, init_logging, run_cli};
use dirsort::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log.as_deref()) {
        OutputFormatter::error(&e.to_string());
        return ExitCode::FAILURE;
    }

    match run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
