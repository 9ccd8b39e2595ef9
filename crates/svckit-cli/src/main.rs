//! svckit - Windows service template
//!
//! Installs, controls and runs a service built on `svckit-core`. With no
//! recognised command the usage text is printed.

mod args;
mod commands;
mod logging;

use std::process::ExitCode;

use crate::args::Args;

fn main() -> ExitCode {
    let args = match Args::try_parse_lenient(std::env::args_os()) {
        Ok(Some(args)) => args,
        Ok(None) => {
            commands::print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => e.exit(),
    };

    match commands::execute(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            commands::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
