//! Command-line control of a service
//!
//! The [`Controller`] executes management commands (install, start, stop,
//! uninstall) against a [`ServiceRegistry`]. [`run_console`] runs the
//! service body in the foreground instead.

mod command;

pub use command::{CommandSet, ControlCommand};

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::DEFAULT_CONTROL_TIMEOUT_SECS;
use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};
use crate::host::{InstallStatus, PrivilegeCheck, ServiceRegistry};
use crate::lifecycle::LifecycleMachine;
use crate::state::ServiceState;
use crate::worker::CancellationToken;

/// Printed when install/uninstall runs without elevation
pub const ELEVATION_REQUIRED: &str =
    "Administrator privileges are required. Run this command from an elevated prompt.";

/// Usage listing for `program`
pub fn usage(program: &str) -> String {
    format!(
        "Usage : {program} [command] [command ...]\n\
         Commands :\n \
         - install : Install the service\n \
         - uninstall : Uninstall the service\n \
         - start : Start the service\n \
         - stop : Stop the service\n \
         - console : Run the service as a console application\n"
    )
}

/// Result of running a [`CommandSet`]
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Commands that completed
    pub succeeded: Vec<ControlCommand>,
    /// Commands that failed, with their error
    pub failed: Vec<(ControlCommand, Error)>,
}

impl ExecutionReport {
    /// Whether every command completed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Process exit code: zero only if nothing failed
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }
}

/// Executes management commands for one service
pub struct Controller<'a, W: Write> {
    descriptor: &'a ServiceDescriptor,
    registry: &'a dyn ServiceRegistry,
    privileges: &'a dyn PrivilegeCheck,
    control_timeout: Duration,
    program: String,
    out: W,
}

impl<'a, W: Write> Controller<'a, W> {
    /// Create a controller writing progress messages to `out`
    pub fn new(
        descriptor: &'a ServiceDescriptor,
        registry: &'a dyn ServiceRegistry,
        privileges: &'a dyn PrivilegeCheck,
        out: W,
    ) -> Self {
        Self {
            descriptor,
            registry,
            privileges,
            control_timeout: Duration::from_secs(DEFAULT_CONTROL_TIMEOUT_SECS),
            program: "svckit".to_string(),
            out,
        }
    }

    /// How long start/stop wait for the target state
    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// Program name shown in the usage listing
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run every command of `set` in order.
    ///
    /// A failed command does not prevent the following ones from running.
    /// `Console` is not handled here; see [`run_console`].
    pub fn run(&mut self, set: &CommandSet) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for &command in set.commands() {
            debug!(%command, service = %self.descriptor.name, "Executing command");
            match self.execute(command) {
                Ok(()) => report.succeeded.push(command),
                Err(e) => report.failed.push((command, e)),
            }
        }

        report
    }

    /// Execute a single command
    pub fn execute(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Install => self.install(),
            ControlCommand::Uninstall => self.uninstall(),
            ControlCommand::Start => self.start(),
            ControlCommand::Stop => self.stop(),
            ControlCommand::Usage => {
                write!(self.out, "{}", usage(&self.program))?;
                Ok(())
            }
            ControlCommand::Console => Err(Error::UnsupportedOperation {
                operation: "console",
            }),
        }
    }

    /// Register the service
    pub fn install(&mut self) -> Result<()> {
        self.require_elevation("install")?;
        self.descriptor.validate()?;

        let descriptor = self.descriptor;
        let name = &descriptor.name;
        if self.registry.query_status(name)?.is_installed() {
            return Err(Error::AlreadyInstalled { name: name.clone() });
        }

        self.registry.register(descriptor)?;
        info!(service = %name, "Service installed");
        writeln!(self.out, "Service '{name}' installed")?;
        Ok(())
    }

    /// Remove the service registration, stopping it first
    pub fn uninstall(&mut self) -> Result<()> {
        self.require_elevation("uninstall")?;

        let descriptor = self.descriptor;
        let name = &descriptor.name;
        let state = match self.registry.query_status(name)? {
            InstallStatus::NotInstalled => {
                self.report_missing()?;
                return Err(Error::not_installed(name.clone()));
            }
            InstallStatus::Installed(state) => state,
        };

        if state != ServiceState::Stopped {
            writeln!(self.out, "Stopping service '{name}'...")?;
            self.registry
                .request_transition(name, ServiceState::Stopped, self.control_timeout)?;
        }

        self.registry.deregister(name)?;
        info!(service = %name, "Service uninstalled");
        writeln!(self.out, "Service '{name}' uninstalled")?;
        Ok(())
    }

    /// Ask the control manager to start the service
    pub fn start(&mut self) -> Result<()> {
        self.transition(ServiceState::Running, "Starting", "running")
    }

    /// Ask the control manager to stop the service
    pub fn stop(&mut self) -> Result<()> {
        self.transition(ServiceState::Stopped, "Stopping", "stopped")
    }

    fn transition(&mut self, target: ServiceState, verb: &str, adjective: &str) -> Result<()> {
        let descriptor = self.descriptor;
        let name = &descriptor.name;
        match self.registry.query_status(name)? {
            InstallStatus::NotInstalled => self.report_missing(),
            InstallStatus::Installed(state) if state == target => {
                writeln!(self.out, "Service '{name}' is already {adjective}")?;
                Ok(())
            }
            InstallStatus::Installed(_) => {
                writeln!(self.out, "{verb} service '{name}'...")?;
                let reached = self
                    .registry
                    .request_transition(name, target, self.control_timeout)?;
                info!(service = %name, state = %reached, "Service transitioned");
                writeln!(self.out, "Service '{name}' is {adjective}")?;
                Ok(())
            }
        }
    }

    fn require_elevation(&mut self, operation: &'static str) -> Result<()> {
        if self.privileges.is_elevated() {
            return Ok(());
        }
        writeln!(self.out, "{ELEVATION_REQUIRED}")?;
        Err(Error::PermissionDenied { operation })
    }

    fn report_missing(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "Service missing: '{}' is not installed",
            self.descriptor.name
        )?;
        Ok(())
    }
}

/// Run the service body in the foreground.
///
/// Starts `machine`, blocks until `interrupt` is cancelled, then stops it.
/// The worker is checked every heartbeat; a fault stops the machine and is
/// returned without waiting for the interrupt.
pub fn run_console<W: Write>(
    machine: &mut LifecycleMachine,
    interrupt: &CancellationToken,
    name: &str,
    mut out: W,
) -> Result<()> {
    writeln!(out, "Starting {name} in console mode...")?;
    machine.start()?;
    writeln!(out, "Started. Press Ctrl+C to stop.")?;

    let heartbeat = machine.options().heartbeat;
    while !interrupt.wait_timeout(heartbeat) {
        if let Err(e) = machine.check_worker() {
            writeln!(out, "{name} failed: {e}")?;
            return Err(e);
        }
        if machine.state() == ServiceState::Stopped {
            writeln!(out, "{name} exited")?;
            return Ok(());
        }
    }

    writeln!(out, "Stopping {name}...")?;
    machine.stop()?;
    writeln!(out, "Stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockPrivilegeCheck, MockServiceRegistry};
    use crate::lifecycle::LifecycleOptions;
    use crate::worker::Worker;
    use mockall::predicate::*;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new("TestService")
    }

    fn elevated(yes: bool) -> MockPrivilegeCheck {
        let mut privileges = MockPrivilegeCheck::new();
        privileges.expect_is_elevated().return_const(yes);
        privileges
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_start_missing_service_is_soft() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .with(eq("TestService"))
            .times(1)
            .returning(|_| Ok(InstallStatus::NotInstalled));
        registry.expect_request_transition().never();
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["start"]));

        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert!(output(out).contains("Service missing"));
    }

    #[test]
    fn test_install_without_elevation() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry.expect_register().never();
        registry.expect_query_status().never();
        let privileges = elevated(false);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["install"]));

        assert_eq!(report.exit_code(), 1);
        assert!(matches!(
            report.failed[0].1,
            Error::PermissionDenied { operation: "install" }
        ));
        assert!(output(out).contains(ELEVATION_REQUIRED));
    }

    #[test]
    fn test_install_registers_descriptor() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::NotInstalled));
        registry
            .expect_register()
            .withf(|d: &ServiceDescriptor| d.name == "TestService")
            .times(1)
            .returning(|_| Ok(()));
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["Install"]));

        assert!(report.is_success());
        assert!(output(out).contains("installed"));
    }

    #[test]
    fn test_install_twice_fails() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::Installed(ServiceState::Stopped)));
        registry.expect_register().never();
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["install"]));

        assert!(matches!(report.failed[0].1, Error::AlreadyInstalled { .. }));
    }

    #[test]
    fn test_order_is_fixed() {
        let desc = descriptor();
        let privileges = elevated(true);

        for args in [["stop", "install"], ["install", "stop"]] {
            let mut seq = Sequence::new();
            let mut registry = MockServiceRegistry::new();
            registry
                .expect_query_status()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(InstallStatus::NotInstalled));
            registry
                .expect_register()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            registry
                .expect_query_status()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(InstallStatus::Installed(ServiceState::Running)));
            registry
                .expect_request_transition()
                .with(eq("TestService"), eq(ServiceState::Stopped), always())
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, target, _| Ok(target));

            let mut out = Vec::new();
            let report = Controller::new(&desc, &registry, &privileges, &mut out)
                .run(&CommandSet::parse(args));

            assert_eq!(report.succeeded, vec![ControlCommand::Install, ControlCommand::Stop]);
            let text = output(out);
            let installed = text.find("installed").unwrap();
            let stopping = text.find("Stopping").unwrap();
            assert!(installed < stopping);
        }
    }

    #[test]
    fn test_start_timeout_reported() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::Installed(ServiceState::Stopped)));
        registry
            .expect_request_transition()
            .with(eq("TestService"), eq(ServiceState::Running), eq(Duration::from_secs(10)))
            .returning(|_, target, timeout| {
                Err(Error::Timeout {
                    target,
                    waited: timeout,
                    last: Some(ServiceState::StartPending),
                })
            });
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["start"]));

        assert_eq!(report.exit_code(), 1);
        let message = report.failed[0].1.to_string();
        assert!(message.contains("StartPending"));
    }

    #[test]
    fn test_stop_already_stopped() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::Installed(ServiceState::Stopped)));
        registry.expect_request_transition().never();
        let privileges = elevated(false);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["stop"]));

        assert!(report.is_success());
        assert!(output(out).contains("already stopped"));
    }

    #[test]
    fn test_uninstall_stops_first() {
        let desc = descriptor();
        let mut seq = Sequence::new();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::Installed(ServiceState::Running)));
        registry
            .expect_request_transition()
            .with(eq("TestService"), eq(ServiceState::Stopped), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, target, _| Ok(target));
        registry
            .expect_deregister()
            .with(eq("TestService"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["uninstall"]));

        assert!(report.is_success());
    }

    #[test]
    fn test_uninstall_missing_fails() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_query_status()
            .returning(|_| Ok(InstallStatus::NotInstalled));
        registry.expect_deregister().never();
        let privileges = elevated(true);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["uninstall"]));

        assert!(matches!(report.failed[0].1, Error::NotInstalled { .. }));
        assert!(output(out).contains("Service missing"));
    }

    #[test]
    fn test_failure_does_not_block_later_commands() {
        let desc = descriptor();
        let mut registry = MockServiceRegistry::new();
        registry.expect_register().never();
        registry
            .expect_query_status()
            .times(1)
            .returning(|_| Ok(InstallStatus::Installed(ServiceState::Stopped)));
        registry
            .expect_request_transition()
            .times(1)
            .returning(|_, target, _| Ok(target));
        let privileges = elevated(false);

        let mut out = Vec::new();
        let report = Controller::new(&desc, &registry, &privileges, &mut out)
            .run(&CommandSet::parse(["start", "install"]));

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ControlCommand::Install);
        assert_eq!(report.succeeded, vec![ControlCommand::Start]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_usage_lists_commands() {
        let text = usage("svckit");
        for word in ["install", "uninstall", "start", "stop", "console"] {
            assert!(text.contains(word));
        }
    }

    #[test]
    fn test_console_with_immediate_interrupt() {
        struct Counting(Arc<AtomicUsize>);
        impl Worker for Counting {
            fn run_once(&mut self) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let units = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&units);
        let factory = move || -> Box<dyn crate::worker::Worker> {
            Box::new(Counting(Arc::clone(&counter)))
        };
        let mut machine = LifecycleMachine::new(factory, LifecycleOptions::default());

        let interrupt = CancellationToken::new();
        interrupt.cancel();

        let mut out = Vec::new();
        run_console(&mut machine, &interrupt, "TestService", &mut out).unwrap();

        assert_eq!(machine.state(), ServiceState::Stopped);
        assert_eq!(units.load(Ordering::SeqCst), 0);
        assert!(output(out).contains("Stopped"));
    }

    #[test]
    fn test_console_surfaces_worker_fault() {
        struct DiskFull;
        impl Worker for DiskFull {
            fn run_once(&mut self) -> Result<()> {
                Err(Error::worker_fault("disk full"))
            }
        }

        let options = LifecycleOptions::default()
            .with_work_interval(std::time::Duration::from_millis(5))
            .with_heartbeat(std::time::Duration::from_millis(10));
        let mut machine = LifecycleMachine::new(
            || -> Box<dyn crate::worker::Worker> { Box::new(DiskFull) },
            options,
        );

        // Never cancelled: only the fault can end the run.
        let interrupt = CancellationToken::new();
        let began = std::time::Instant::now();
        let mut out = Vec::new();
        let err = run_console(&mut machine, &interrupt, "TestService", &mut out).unwrap_err();

        assert!(matches!(err, Error::WorkerFault(_)), "unexpected error: {err}");
        assert!(err.to_string().contains("disk full"));
        assert_eq!(machine.state(), ServiceState::Stopped);
        assert_ne!(machine.status().exit_code, 0);
        assert!(began.elapsed() < std::time::Duration::from_secs(5));
        assert!(output(out).contains("TestService failed"));
    }
}
