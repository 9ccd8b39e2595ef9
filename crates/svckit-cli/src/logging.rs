//! Logging initialization

use anyhow::{Context, Result};
use std::path::Path;
#[cfg(windows)]
use std::path::PathBuf;
use tracing::Level;
#[cfg(windows)]
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Directory under the executable directory holding service-mode logs
#[cfg(windows)]
const SERVICE_LOG_DIR: &str = "logs";

fn level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn env_filter(args: &Args) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level(args).into())
        .from_env_lossy()
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))
}

/// Initialize console logging based on CLI arguments.
///
/// Log lines go to stderr so they never interleave with command output.
pub fn init(args: &Args) -> Result<()> {
    let env_filter = env_filter(args);

    match args.log_format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_target(args.verbose >= 2)
                    .with_thread_ids(args.verbose >= 3)
                    .with_file(args.verbose >= 3)
                    .with_line_number(args.verbose >= 3),
            );

            if let Some(ref log_file) = args.log_file {
                let file_layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(open_log_file(log_file)?);
                subscriber.with(file_layer).try_init()?;
            } else {
                subscriber.try_init()?;
            }
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr));

            if let Some(ref log_file) = args.log_file {
                let file_layer = fmt::layer().json().with_writer(open_log_file(log_file)?);
                subscriber.with(file_layer).try_init()?;
            } else {
                subscriber.try_init()?;
            }
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr));

            if let Some(ref log_file) = args.log_file {
                let file_layer = fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_writer(open_log_file(log_file)?);
                subscriber.with(file_layer).try_init()?;
            } else {
                subscriber.try_init()?;
            }
        }
    }

    Ok(())
}

/// Directory service-mode logs are written to
#[cfg(windows)]
pub fn service_log_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate the running executable")?;
    let dir = exe
        .parent()
        .context("Executable has no parent directory")?
        .join(SERVICE_LOG_DIR);
    Ok(dir)
}

/// Initialize logging for a process started by the service control manager.
///
/// There is no console, so everything goes to a daily-rolling file
/// `logs/<name>.log` next to the executable. The returned guard flushes
/// the writer on drop and must live until the service exits.
#[cfg(windows)]
pub fn init_service(args: &Args, name: &str) -> Result<WorkerGuard> {
    let dir = service_log_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, format!("{name}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    let registry = tracing_subscriber::registry().with(env_filter(args));
    match args.log_format {
        LogFormat::Json => registry.with(layer.json()).try_init()?,
        LogFormat::Compact => registry.with(layer.compact()).try_init()?,
        LogFormat::Text => registry.with(layer).try_init()?,
    }

    Ok(guard)
}
