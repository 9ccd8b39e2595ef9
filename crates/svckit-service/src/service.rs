//! Windows Service implementation
//!
//! Entry point used when the Service Control Manager launches the binary.
//! There is no console at this point: logging must already be directed to a
//! file by the caller.

#![cfg(windows)]

use std::ffi::OsString;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use svckit_core::{
    Config, ControlsAccepted, EventLog, LifecycleMachine, LifecycleOptions, NullEventLog,
    PowerEvent, ServiceState, ServiceStatus, StatusReporter,
};
use svckit_platform::WindowsEventLog;
use tracing::{error, info, warn};
use windows_service::service::{
    PowerEventParam, ServiceControl, ServiceControlAccept, ServiceExitCode,
    ServiceState as ScmState, ServiceStatus as ScmStatus, ServiceType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::{define_windows_service, service_dispatcher};

use crate::host::{ControlRequest, ServiceHost};
use crate::worker::heartbeat_factory;

const SERVICE_TYPE: ServiceType = ServiceType::OWN_PROCESS;

static CONFIG: OnceCell<Config> = OnceCell::new();

define_windows_service!(ffi_service_main, service_main);

/// Run as Windows service.
///
/// Blocks until the service stops. Fails immediately when the process was
/// not started by the Service Control Manager.
pub fn run(config: Config) -> Result<()> {
    let name = config.service.name.clone();
    CONFIG
        .set(config)
        .map_err(|_| anyhow!("service already started in this process"))?;

    info!(service = %name, "Connecting to the service control dispatcher");
    service_dispatcher::start(&name, ffi_service_main)
        .with_context(|| format!("Failed to start service dispatcher for {name}"))
}

fn service_main(_arguments: Vec<OsString>) {
    if let Err(e) = run_service() {
        error!(error = %format!("{e:#}"), "Service failed");
    }
}

fn run_service() -> Result<()> {
    let config = CONFIG.get().context("service configuration missing")?;
    let (tx, rx) = mpsc::channel();

    let event_handler = move |control_event| -> ServiceControlHandlerResult {
        let request = match control_event {
            ServiceControl::Interrogate => ControlRequest::Interrogate,
            ServiceControl::Stop => ControlRequest::Stop,
            ServiceControl::Pause => ControlRequest::Pause,
            ServiceControl::Continue => ControlRequest::Continue,
            ServiceControl::Shutdown => ControlRequest::Shutdown,
            ServiceControl::PowerEvent(param) => ControlRequest::Power(power_event(param)),
            _ => return ServiceControlHandlerResult::NotImplemented,
        };
        if tx.send(request).is_err() {
            warn!(?request, "Service main loop is gone");
        }
        ServiceControlHandlerResult::NoError
    };

    let status_handle = service_control_handler::register(&config.service.name, event_handler)
        .context("Failed to register service control handler")?;

    let options = LifecycleOptions::from(&config.lifecycle);
    let machine = LifecycleMachine::new(heartbeat_factory(config.service.name.clone()), options)
        .with_reporter(ScmStatusReporter::new(status_handle));

    let event_log: Arc<dyn EventLog> = if config.event_log.enabled {
        Arc::new(WindowsEventLog)
    } else {
        Arc::new(NullEventLog)
    };
    let source = config.event_log.enabled.then(|| config.event_source());

    let mut host = ServiceHost::new(machine, event_log, source);
    host.run(&rx).context("Service stopped with an error")
}

/// Forwards lifecycle status to `SetServiceStatus`
struct ScmStatusReporter {
    handle: ServiceStatusHandle,
}

impl ScmStatusReporter {
    fn new(handle: ServiceStatusHandle) -> Self {
        Self { handle }
    }
}

impl StatusReporter for ScmStatusReporter {
    fn report(&self, status: &ServiceStatus) {
        if let Err(e) = self.handle.set_service_status(to_scm_status(status)) {
            warn!(error = %e, state = %status.state, "Failed to set service status");
        }
    }
}

fn to_scm_status(status: &ServiceStatus) -> ScmStatus {
    ScmStatus {
        service_type: SERVICE_TYPE,
        current_state: to_scm_state(status.state),
        controls_accepted: to_scm_controls(status.controls_accepted),
        exit_code: if status.exit_code == 0 {
            ServiceExitCode::Win32(0)
        } else {
            ServiceExitCode::ServiceSpecific(status.exit_code)
        },
        checkpoint: status.checkpoint,
        wait_hint: status.wait_hint,
        process_id: None,
    }
}

fn to_scm_state(state: ServiceState) -> ScmState {
    match state {
        ServiceState::Stopped => ScmState::Stopped,
        ServiceState::StartPending => ScmState::StartPending,
        ServiceState::Running => ScmState::Running,
        ServiceState::StopPending => ScmState::StopPending,
        ServiceState::Paused => ScmState::Paused,
        ServiceState::PausePending => ScmState::PausePending,
        ServiceState::ContinuePending => ScmState::ContinuePending,
    }
}

fn to_scm_controls(controls: ControlsAccepted) -> ServiceControlAccept {
    let mut accepted = ServiceControlAccept::empty();
    if controls.contains(ControlsAccepted::STOP) {
        accepted |= ServiceControlAccept::STOP;
    }
    if controls.contains(ControlsAccepted::PAUSE_CONTINUE) {
        accepted |= ServiceControlAccept::PAUSE_CONTINUE;
    }
    if controls.contains(ControlsAccepted::SHUTDOWN) {
        accepted |= ServiceControlAccept::SHUTDOWN;
    }
    if controls.contains(ControlsAccepted::POWER_EVENT) {
        accepted |= ServiceControlAccept::POWER_EVENT;
    }
    accepted
}

fn power_event(param: PowerEventParam) -> PowerEvent {
    match param {
        PowerEventParam::QuerySuspend => PowerEvent::QuerySuspend,
        PowerEventParam::Suspend => PowerEvent::Suspend,
        PowerEventParam::ResumeSuspend => PowerEvent::ResumeSuspend,
        PowerEventParam::ResumeAutomatic => PowerEvent::ResumeAutomatic,
        PowerEventParam::ResumeCritical => PowerEvent::ResumeCritical,
        PowerEventParam::BatteryLow => PowerEvent::BatteryLow,
        PowerEventParam::PowerStatusChange => PowerEvent::PowerStatusChange,
        PowerEventParam::OemEvent(code) => PowerEvent::Other(code),
        _ => PowerEvent::Other(0),
    }
}
