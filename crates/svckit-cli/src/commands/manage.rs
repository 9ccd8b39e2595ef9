//! install / uninstall / start / stop against the service control manager

use anyhow::Result;
use svckit_core::CommandSet;

use super::config::Loaded;

/// Message printed where no service manager is available
#[cfg(not(windows))]
pub const UNSUPPORTED_PLATFORM: &str = "Service management is only available on Windows.";

/// Run the management commands in `set`; returns the process exit code
#[cfg(windows)]
pub fn run(loaded: &Loaded, set: &CommandSet, program: &str) -> Result<u8> {
    use anyhow::Context;
    use std::io;
    use svckit_core::{ControlCommand, Controller};
    use svckit_platform::windows::{install_event_source, remove_event_source};
    use svckit_platform::{TokenPrivilegeCheck, WindowsServiceRegistry};
    use tracing::warn;

    let config = &loaded.config;
    let descriptor = &config.service;

    let registry = WindowsServiceRegistry::for_current_exe(launch_arguments(loaded)?)
        .context("Cannot locate the running executable")?;
    let privileges = TokenPrivilegeCheck;

    let report = Controller::new(descriptor, &registry, &privileges, io::stdout())
        .with_control_timeout(config.lifecycle.control_timeout())
        .with_program(program)
        .run(set);

    if config.event_log.enabled {
        let source = config.event_source();
        let log_name = &config.event_log.log_name;
        if report.succeeded.contains(&ControlCommand::Install) {
            if let Err(e) = install_event_source(log_name, &source) {
                warn!(error = %e, source = %source, "Event source not registered");
            }
        }
        if report.succeeded.contains(&ControlCommand::Uninstall) {
            if let Err(e) = remove_event_source(log_name, &source) {
                warn!(error = %e, source = %source, "Event source not removed");
            }
        }
    }

    for (command, error) in &report.failed {
        super::print_error(&format!("{command}: {error}"));
    }

    Ok(exit_code(report.exit_code()))
}

/// Arguments the SCM passes when it launches the service. The name and an
/// absolute config path are baked in so the service sees the same identity
/// the CLI registered.
#[cfg(windows)]
fn launch_arguments(loaded: &Loaded) -> Result<Vec<std::ffi::OsString>> {
    use anyhow::Context;
    use std::ffi::OsString;

    let mut arguments = vec![
        OsString::from("--run-as-service"),
        OsString::from("--name"),
        OsString::from(&loaded.config.service.name),
    ];
    if let Some(path) = &loaded.path {
        let absolute = std::fs::canonicalize(path)
            .with_context(|| format!("Cannot resolve config path {}", path.display()))?;
        arguments.push(OsString::from("--config"));
        arguments.push(absolute.into_os_string());
    }
    Ok(arguments)
}

/// Without a service manager every management command fails
#[cfg(not(windows))]
pub fn run(loaded: &Loaded, set: &CommandSet, _program: &str) -> Result<u8> {
    tracing::debug!(
        service = %loaded.config.service.name,
        commands = ?set.commands(),
        "Service management requested on an unsupported platform"
    );
    super::print_error(UNSUPPORTED_PLATFORM);
    Ok(1)
}

#[cfg_attr(not(windows), allow(dead_code))]
fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
