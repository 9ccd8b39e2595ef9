//! Service Control Manager registry

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use svckit_core::{
    InstallStatus, ServiceDescriptor, ServiceRegistry, ServiceState, StartupMode,
};
use tracing::{debug, info, warn};
use windows_service::service::{
    Service, ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType,
    ServiceState as ScmState, ServiceType,
};
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

use super::map_service_error;
use crate::error::{PlatformError, Result};

/// Interval between status polls while waiting for a transition
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// [`ServiceRegistry`] backed by the local Service Control Manager
#[derive(Debug, Clone)]
pub struct WindowsServiceRegistry {
    executable: PathBuf,
    launch_arguments: Vec<OsString>,
}

impl WindowsServiceRegistry {
    /// Register services that launch `executable` with `launch_arguments`
    pub fn new(executable: PathBuf, launch_arguments: Vec<OsString>) -> Self {
        Self {
            executable,
            launch_arguments,
        }
    }

    /// Register services that launch the running executable
    pub fn for_current_exe(launch_arguments: Vec<OsString>) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, launch_arguments))
    }

    fn manager(access: ServiceManagerAccess) -> Result<ServiceManager> {
        ServiceManager::local_computer(None::<&str>, access)
            .map_err(|e| map_service_error(e, "", "connect to the service manager"))
    }

    fn open(name: &str, access: ServiceAccess, operation: &'static str) -> Result<Service> {
        Self::manager(ServiceManagerAccess::CONNECT)?
            .open_service(name, access)
            .map_err(|e| map_service_error(e, name, operation))
    }

    fn current_state(service: &Service, name: &str) -> Result<ServiceState> {
        let status = service
            .query_status()
            .map_err(|e| map_service_error(e, name, "query"))?;
        Ok(from_scm_state(status.current_state))
    }

    /// Poll until `target` is reached or `timeout` elapses
    fn wait_for(
        service: &Service,
        name: &str,
        target: ServiceState,
        timeout: Duration,
    ) -> svckit_core::Result<ServiceState> {
        let started = Instant::now();
        loop {
            let state = Self::current_state(service, name)?;
            if state == target {
                return Ok(state);
            }
            if started.elapsed() >= timeout {
                warn!(service = name, %state, %target, "Service did not reach target state");
                return Err(svckit_core::Error::Timeout {
                    target,
                    waited: timeout,
                    last: Some(state),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ServiceRegistry for WindowsServiceRegistry {
    fn register(&self, descriptor: &ServiceDescriptor) -> svckit_core::Result<()> {
        let name = descriptor.name.as_str();
        let manager =
            Self::manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;

        let info = ServiceInfo {
            name: OsString::from(name),
            display_name: OsString::from(&descriptor.display_name),
            service_type: ServiceType::OWN_PROCESS,
            start_type: start_type(descriptor.startup),
            error_control: ServiceErrorControl::Normal,
            executable_path: self.executable.clone(),
            launch_arguments: self.launch_arguments.clone(),
            dependencies: vec![],
            account_name: descriptor.account.account_name().map(OsString::from),
            account_password: descriptor.account.password().map(OsString::from),
        };

        debug!(service = name, executable = %self.executable.display(), "Creating service");
        let service = manager
            .create_service(&info, ServiceAccess::CHANGE_CONFIG)
            .map_err(|e| map_service_error(e, name, "install"))?;

        if !descriptor.description.is_empty() {
            service
                .set_description(&descriptor.description)
                .map_err(|e| map_service_error(e, name, "install"))?;
        }
        if descriptor.startup == StartupMode::AutomaticDelayed {
            service
                .set_delayed_auto_start(true)
                .map_err(|e| map_service_error(e, name, "install"))?;
        }

        info!(service = name, "Service registered");
        Ok(())
    }

    fn deregister(&self, name: &str) -> svckit_core::Result<()> {
        let service = Self::open(name, ServiceAccess::DELETE, "uninstall")?;
        service
            .delete()
            .map_err(|e| map_service_error(e, name, "uninstall"))?;
        info!(service = name, "Service marked for deletion");
        Ok(())
    }

    fn query_status(&self, name: &str) -> svckit_core::Result<InstallStatus> {
        match Self::open(name, ServiceAccess::QUERY_STATUS, "query") {
            Ok(service) => Ok(InstallStatus::Installed(Self::current_state(&service, name)?)),
            Err(PlatformError::ServiceNotFound(_)) => Ok(InstallStatus::NotInstalled),
            Err(e) => Err(e.into()),
        }
    }

    fn request_transition(
        &self,
        name: &str,
        target: ServiceState,
        timeout: Duration,
    ) -> svckit_core::Result<ServiceState> {
        let access = ServiceAccess::QUERY_STATUS
            | ServiceAccess::START
            | ServiceAccess::STOP
            | ServiceAccess::PAUSE_CONTINUE;

        let result = match target {
            ServiceState::Running => {
                let service = Self::open(name, access, "start")?;
                let current = Self::current_state(&service, name)?;
                let sent = if current == ServiceState::Paused {
                    service.resume().map(|_| ())
                } else {
                    service.start(&[] as &[&OsStr])
                };
                sent.map_err(|e| map_service_error(e, name, "start"))?;
                service
            }
            ServiceState::Stopped => {
                let service = Self::open(name, access, "stop")?;
                service
                    .stop()
                    .map_err(|e| map_service_error(e, name, "stop"))?;
                service
            }
            ServiceState::Paused => {
                let service = Self::open(name, access, "pause")?;
                service
                    .pause()
                    .map_err(|e| map_service_error(e, name, "pause"))?;
                service
            }
            other => {
                debug!(service = name, target = %other, "Refusing transition to a pending state");
                return Err(svckit_core::Error::UnsupportedOperation {
                    operation: "transition to a pending state",
                });
            }
        };

        Self::wait_for(&result, name, target, timeout)
    }
}

fn start_type(mode: StartupMode) -> ServiceStartType {
    match mode {
        StartupMode::Automatic | StartupMode::AutomaticDelayed => ServiceStartType::AutoStart,
        StartupMode::Manual => ServiceStartType::OnDemand,
        StartupMode::Disabled => ServiceStartType::Disabled,
    }
}

fn from_scm_state(state: ScmState) -> ServiceState {
    match state {
        ScmState::Stopped => ServiceState::Stopped,
        ScmState::StartPending => ServiceState::StartPending,
        ScmState::StopPending => ServiceState::StopPending,
        ScmState::Running => ServiceState::Running,
        ScmState::ContinuePending => ServiceState::ContinuePending,
        ScmState::PausePending => ServiceState::PausePending,
        ScmState::Paused => ServiceState::Paused,
    }
}
