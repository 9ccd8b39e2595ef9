//! Command-line arguments

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;
use svckit_core::StartupMode;

/// svckit - install, control and run a Windows service
#[derive(Parser, Debug)]
#[command(name = "svckit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Commands to run: install, uninstall, start, stop, console.
    /// Case-insensitive, any order; they always run in the order
    /// install, start, stop, uninstall.
    #[arg(value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Configuration file
    #[arg(short, long, env = "SVCKIT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Service name (registration key)
    #[arg(long)]
    pub name: Option<String>,

    /// Name shown in the services console
    #[arg(long)]
    pub display_name: Option<String>,

    /// Description shown in the services console
    #[arg(long)]
    pub description: Option<String>,

    /// Startup mode
    #[arg(long, value_enum)]
    pub startup: Option<StartupArg>,

    /// Account the service runs as
    #[arg(long, value_enum)]
    pub account: Option<AccountArg>,

    /// User name for `--account user`
    #[arg(long)]
    pub username: Option<String>,

    /// Password for `--account user`
    #[arg(long, env = "SVCKIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Entry point used by the service control manager
    #[arg(long, hide = true)]
    pub run_as_service: bool,
}

impl Args {
    /// Parse, treating an unrecognised option like an unrecognised command.
    ///
    /// `Ok(None)` means the usage text should be shown. `--help`,
    /// `--version` and bad option values stay clap errors.
    pub fn try_parse_lenient<I, T>(itr: I) -> Result<Option<Self>, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(itr) {
            Ok(args) => Ok(Some(args)),
            Err(e) if e.kind() == ErrorKind::UnknownArgument => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON lines
    Json,
    /// Compact single-line
    Compact,
}

/// `--startup` values
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupArg {
    /// Started at boot
    Automatic,
    /// Started shortly after boot
    AutomaticDelayed,
    /// Started on demand
    Manual,
    /// Cannot be started
    Disabled,
}

impl From<StartupArg> for StartupMode {
    fn from(arg: StartupArg) -> Self {
        match arg {
            StartupArg::Automatic => Self::Automatic,
            StartupArg::AutomaticDelayed => Self::AutomaticDelayed,
            StartupArg::Manual => Self::Manual,
            StartupArg::Disabled => Self::Disabled,
        }
    }
}

/// `--account` values
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountArg {
    /// Built-in SYSTEM account
    LocalSystem,
    /// Built-in low-privilege local account
    LocalService,
    /// Built-in account with network credentials
    NetworkService,
    /// A specific user, see `--username`
    User,
}
