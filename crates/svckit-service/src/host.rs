//! Control request routing
//!
//! The SCM delivers control codes on its own thread. The handler forwards
//! them as [`ControlRequest`]s over a channel to the service main thread,
//! where [`ServiceHost::run`] applies them to the lifecycle machine one at a
//! time. This keeps every lifecycle operation on a single thread.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;

use svckit_core::{EventLog, LifecycleMachine, PowerEvent, Result, ServiceState, ServiceStatus};
use tracing::{debug, error, info, warn};

/// A control request from the service control manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Stop the service
    Stop,
    /// Suspend work
    Pause,
    /// Resume work
    Continue,
    /// The system is shutting down
    Shutdown,
    /// Power state change
    Power(PowerEvent),
    /// Re-publish the current status
    Interrogate,
}

/// Owns the lifecycle machine of a running service
pub struct ServiceHost {
    machine: LifecycleMachine,
    event_log: Arc<dyn EventLog>,
    source: Option<String>,
}

impl ServiceHost {
    /// Create a host. Event log entries are written under `source`, or not
    /// at all when it is `None`.
    pub fn new(machine: LifecycleMachine, event_log: Arc<dyn EventLog>, source: Option<String>) -> Self {
        Self {
            machine,
            event_log,
            source,
        }
    }

    /// Current state
    pub fn state(&self) -> ServiceState {
        self.machine.state()
    }

    /// Current status
    pub fn status(&self) -> ServiceStatus {
        self.machine.status()
    }

    /// Start the worker
    pub fn on_start(&mut self) -> Result<()> {
        self.note("In OnStart");
        self.machine.start()
    }

    /// Apply one control request
    pub fn handle(&mut self, request: ControlRequest) -> Result<()> {
        debug!(?request, state = %self.machine.state(), "Control request");
        match request {
            ControlRequest::Stop => {
                self.note("In OnStop");
                self.machine.stop()
            }
            ControlRequest::Pause => {
                self.note("In OnPause");
                self.machine.pause()
            }
            ControlRequest::Continue => {
                self.note("In OnContinue");
                self.machine.resume()
            }
            ControlRequest::Shutdown => {
                self.note("In OnShutdown");
                self.machine.shutdown()
            }
            ControlRequest::Power(event) => {
                self.note(&format!("In OnPowerEvent: {event:?}"));
                let acted = self.machine.power_event(event)?;
                debug!(?event, acted, "Power event handled");
                Ok(())
            }
            ControlRequest::Interrogate => {
                self.machine.report_status();
                Ok(())
            }
        }
    }

    /// Run until the service stops.
    ///
    /// Starts the worker, then applies requests as they arrive. Between
    /// requests the worker is checked every heartbeat interval; a worker
    /// that exits on its own stops the service. Returns the worker fault,
    /// if any.
    pub fn run(&mut self, requests: &Receiver<ControlRequest>) -> Result<()> {
        self.on_start()?;
        info!(state = %self.machine.state(), "Service running");

        let heartbeat = self.machine.options().heartbeat;
        let mut fault = None;

        while self.machine.state() != ServiceState::Stopped {
            match requests.recv_timeout(heartbeat) {
                Ok(request) => {
                    if let Err(e) = self.handle(request) {
                        if self.machine.state() == ServiceState::Stopped {
                            fault = Some(e);
                        } else {
                            warn!(?request, error = %e, "Control request rejected");
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(e) = self.machine.check_worker() {
                        error!(error = %e, "Worker failed");
                        fault = Some(e);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Control channel closed, stopping");
                    if let Err(e) = self.machine.stop() {
                        fault = Some(e);
                    }
                }
            }
        }

        info!("Service stopped");
        fault.map_or(Ok(()), Err)
    }

    fn note(&self, text: &str) {
        if let Some(source) = &self.source {
            self.event_log.write_entry(source, text);
        }
    }
}

impl std::fmt::Debug for ServiceHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHost")
            .field("machine", &self.machine)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use svckit_core::{Error, LifecycleOptions, Worker};

    #[derive(Default)]
    struct RecordingLog {
        entries: Mutex<Vec<(String, String)>>,
    }

    impl EventLog for RecordingLog {
        fn write_entry(&self, source: &str, text: &str) {
            self.entries.lock().push((source.to_string(), text.to_string()));
        }
    }

    struct Idle;

    impl Worker for Idle {
        fn run_once(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct FailsAfter(u32);

    impl Worker for FailsAfter {
        fn run_once(&mut self) -> Result<()> {
            if self.0 == 0 {
                return Err(Error::worker_fault("queue unavailable"));
            }
            self.0 -= 1;
            Ok(())
        }
    }

    fn options(pause_continue: bool) -> LifecycleOptions {
        LifecycleOptions::default()
            .with_work_interval(Duration::from_millis(5))
            .with_heartbeat(Duration::from_millis(10))
            .with_wait_hint(Duration::from_secs(5))
            .with_pause_continue(pause_continue)
    }

    fn idle_host(pause_continue: bool) -> (ServiceHost, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let machine =
            LifecycleMachine::new(|| -> Box<dyn Worker> { Box::new(Idle) }, options(pause_continue));
        let host = ServiceHost::new(machine, log.clone(), Some("DemoService".into()));
        (host, log)
    }

    fn texts(log: &RecordingLog) -> Vec<String> {
        log.entries.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    #[test]
    fn test_stop_request_ends_run() {
        let (mut host, log) = idle_host(false);
        let (tx, rx) = mpsc::channel();

        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            tx.send(ControlRequest::Interrogate).unwrap();
            tx.send(ControlRequest::Stop).unwrap();
        });

        host.run(&rx).unwrap();
        sender.join().unwrap();

        assert_eq!(host.state(), ServiceState::Stopped);
        assert_eq!(texts(&log), vec!["In OnStart", "In OnStop"]);
        assert!(log.entries.lock().iter().all(|(s, _)| s == "DemoService"));
    }

    #[test]
    fn test_pause_continue_requests() {
        let (mut host, log) = idle_host(true);
        host.on_start().unwrap();

        host.handle(ControlRequest::Pause).unwrap();
        assert_eq!(host.state(), ServiceState::Paused);
        host.handle(ControlRequest::Continue).unwrap();
        assert_eq!(host.state(), ServiceState::Running);
        host.handle(ControlRequest::Shutdown).unwrap();
        assert_eq!(host.state(), ServiceState::Stopped);

        assert_eq!(
            texts(&log),
            vec!["In OnStart", "In OnPause", "In OnContinue", "In OnShutdown"]
        );
    }

    #[test]
    fn test_rejected_request_keeps_running() {
        let (mut host, _) = idle_host(false);
        let (tx, rx) = mpsc::channel();
        tx.send(ControlRequest::Pause).unwrap();
        tx.send(ControlRequest::Stop).unwrap();

        host.run(&rx).unwrap();
        assert_eq!(host.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_power_suspend_pauses() {
        let (mut host, _) = idle_host(true);
        host.on_start().unwrap();

        host.handle(ControlRequest::Power(PowerEvent::Suspend)).unwrap();
        assert_eq!(host.state(), ServiceState::Paused);
        host.handle(ControlRequest::Power(PowerEvent::ResumeAutomatic)).unwrap();
        assert_eq!(host.state(), ServiceState::Running);
        host.handle(ControlRequest::Stop).unwrap();
    }

    #[test]
    fn test_worker_fault_stops_service() {
        let machine = LifecycleMachine::new(
            || -> Box<dyn Worker> { Box::new(FailsAfter(3)) },
            options(false),
        );
        let mut host = ServiceHost::new(machine, Arc::new(RecordingLog::default()), None);
        let (_tx, rx) = mpsc::channel();

        let err = host.run(&rx).unwrap_err();
        assert!(err.to_string().contains("queue unavailable"));
        assert_eq!(host.state(), ServiceState::Stopped);
        assert_ne!(host.status().exit_code, 0);
    }

    #[test]
    fn test_closed_channel_stops() {
        let (mut host, _) = idle_host(false);
        let (tx, rx) = mpsc::channel::<ControlRequest>();
        drop(tx);

        host.run(&rx).unwrap();
        assert_eq!(host.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_no_source_writes_nothing() {
        let log = Arc::new(RecordingLog::default());
        let machine =
            LifecycleMachine::new(|| -> Box<dyn Worker> { Box::new(Idle) }, options(false));
        let mut host = ServiceHost::new(machine, log.clone(), None);
        host.on_start().unwrap();
        host.handle(ControlRequest::Stop).unwrap();
        assert!(log.entries.lock().is_empty());
    }
}
