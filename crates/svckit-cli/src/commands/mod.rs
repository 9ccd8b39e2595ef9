//! CLI commands

pub mod config;
pub mod console;
pub mod manage;

use anyhow::Result;
use colored::Colorize;
use svckit_core::controller::usage;
use svckit_core::CommandSet;
use tracing::debug;

use crate::args::Args;
use crate::logging;

/// Dispatch the parsed arguments; returns the process exit code
pub fn execute(args: &Args) -> Result<u8> {
    if args.run_as_service {
        return run_as_service(args);
    }

    let set = CommandSet::parse(&args.commands);
    if set.is_usage() {
        print_usage();
        return Ok(0);
    }

    logging::init(args)?;
    let loaded = config::load(args)?;
    debug!(commands = ?set.commands(), config = ?loaded.path, "Parsed command line");
    if set.is_console() {
        console::run(&loaded.config)?;
        return Ok(0);
    }

    manage::run(&loaded, &set, &program_name())
}

#[cfg(windows)]
fn run_as_service(args: &Args) -> Result<u8> {
    let loaded = config::load(args)?;
    let _guard = logging::init_service(args, &loaded.config.service.name)?;
    svckit_service::run(loaded.config)?;
    Ok(0)
}

#[cfg(not(windows))]
fn run_as_service(_args: &Args) -> Result<u8> {
    anyhow::bail!("--run-as-service is only supported on Windows")
}

/// Print the usage text to stdout
pub fn print_usage() {
    print!("{}", usage(&program_name()));
}

/// File stem of the running executable, used in the usage text
fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_ref()
        .and_then(|arg0| std::path::Path::new(arg0).file_stem())
        .map_or_else(
            || "svckit".to_string(),
            |stem| stem.to_string_lossy().into_owned(),
        )
}

/// Write an error line to stderr, in red when stderr is a terminal
pub fn print_error(message: &str) {
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{} {}", "Error :".red().bold(), message);
    } else {
        eprintln!("Error : {message}");
    }
}
