//! The lifecycle machine

use std::time::{Duration, Instant};

use super::{LifecycleOptions, PowerEvent};
use crate::error::{Error, Result};
use crate::state::{LifecycleEvent, ServiceState};
use crate::status::{ControlsAccepted, NoopReporter, ServiceStatus, StatusReporter};
use crate::worker::{JoinOutcome, ReadyOutcome, WorkerFactory, WorkerHandle};

/// Exit code reported after a fault
const FAULT_EXIT_CODE: u32 = 1;

/// Owns the state of one service instance and its worker
pub struct LifecycleMachine {
    options: LifecycleOptions,
    state: ServiceState,
    checkpoint: u32,
    exit_code: u32,
    suspended: bool,
    factory: Box<dyn WorkerFactory>,
    reporter: Box<dyn StatusReporter>,
    worker: Option<WorkerHandle>,
}

impl LifecycleMachine {
    /// Create a stopped machine; status updates are discarded
    pub fn new(factory: impl WorkerFactory + 'static, options: LifecycleOptions) -> Self {
        Self {
            options,
            state: ServiceState::Stopped,
            checkpoint: 0,
            exit_code: 0,
            suspended: false,
            factory: Box::new(factory),
            reporter: Box::new(NoopReporter),
            worker: None,
        }
    }

    /// Publish status updates to `reporter`
    pub fn with_reporter(mut self, reporter: impl StatusReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Current state
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Configured options
    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Apply one event to the state machine.
    ///
    /// Pause/continue events on an instance without that capability fail
    /// with `UnsupportedOperation`; events the current state does not
    /// allow fail with `InvalidTransition`. Neither changes the state.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<ServiceState> {
        if event.needs_pause_continue() && !self.options.pause_continue {
            return Err(Error::UnsupportedOperation {
                operation: event.name(),
            });
        }

        let next = self
            .state
            .next(&event)
            .ok_or_else(|| Error::invalid_transition(self.state, event.name()))?;

        match event {
            LifecycleEvent::ErrorOccurred(_) => self.exit_code = FAULT_EXIT_CODE,
            LifecycleEvent::StartRequested => self.exit_code = 0,
            _ => {}
        }

        if next == self.state {
            return Ok(next);
        }

        self.state = next;
        self.checkpoint = u32::from(next.is_pending());
        self.report_status();
        Ok(next)
    }

    /// Start the worker.
    ///
    /// Valid only from `Stopped`. Waits for the worker to initialize for at
    /// most the wait hint, heartbeating meanwhile. On failure the machine
    /// settles in `Stopped` and the error is returned.
    pub fn start(&mut self) -> Result<()> {
        if self.state != ServiceState::Stopped {
            return Err(Error::invalid_transition(self.state, "start"));
        }

        self.apply(LifecycleEvent::StartRequested)?;
        self.suspended = false;

        let worker = self.factory.create();
        let mut handle = match WorkerHandle::spawn(worker, self.options.work_interval) {
            Ok(handle) => handle,
            Err(e) => return self.fail(Error::worker_fault(e.to_string())),
        };

        let started = Instant::now();
        loop {
            let remaining = self.options.wait_hint.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                handle.abandon();
                return self.fail(Error::Timeout {
                    target: ServiceState::Running,
                    waited: self.options.wait_hint,
                    last: Some(ServiceState::StartPending),
                });
            }

            match handle.wait_ready(self.options.heartbeat.min(remaining)) {
                ReadyOutcome::Ready => break,
                ReadyOutcome::Failed(e) => return self.fail(e),
                ReadyOutcome::Pending => self.heartbeat(),
            }
        }

        self.worker = Some(handle);
        self.apply(LifecycleEvent::StartCompleted)?;
        Ok(())
    }

    /// Stop the worker.
    ///
    /// From `Running` or `Paused`: signals cancellation and waits for the
    /// worker's current unit of work to finish, bounded by the wait hint.
    /// From any other state this is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if !self.state.is_active() {
            self.apply(LifecycleEvent::StopRequested)?;
            return Ok(());
        }

        self.apply(LifecycleEvent::StopRequested)?;

        let Some(mut handle) = self.worker.take() else {
            self.apply(LifecycleEvent::StopCompleted)?;
            return Ok(());
        };
        handle.cancel();

        let started = Instant::now();
        let outcome = loop {
            let remaining = self.options.wait_hint.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break None;
            }
            match handle.join_timeout(self.options.heartbeat.min(remaining)) {
                JoinOutcome::Finished(result) => break Some(result),
                JoinOutcome::StillRunning => self.heartbeat(),
            }
        };

        match outcome {
            Some(Ok(())) => {
                self.apply(LifecycleEvent::StopCompleted)?;
                Ok(())
            }
            Some(Err(e)) => self.fail(as_fault(e)),
            None => {
                handle.abandon();
                self.fail(Error::WorkerStuck {
                    waited: self.options.wait_hint,
                })
            }
        }
    }

    /// Suspend work units. Requires the pause/continue capability.
    pub fn pause(&mut self) -> Result<()> {
        self.apply(LifecycleEvent::PauseRequested)?;
        if let Some(handle) = &self.worker {
            handle.set_paused(true);
        }
        self.apply(LifecycleEvent::PauseCompleted)?;
        Ok(())
    }

    /// Resume work units after a pause. Requires the pause/continue capability.
    pub fn resume(&mut self) -> Result<()> {
        self.apply(LifecycleEvent::ContinueRequested)?;
        if let Some(handle) = &self.worker {
            handle.set_paused(false);
        }
        self.suspended = false;
        self.apply(LifecycleEvent::ContinueCompleted)?;
        Ok(())
    }

    /// System shutdown: stop the worker
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop()
    }

    /// React to a power event.
    ///
    /// A suspend pauses a running service when pause/continue is enabled; a
    /// resume continues it only if the suspend paused it. Returns whether
    /// the event changed anything.
    pub fn power_event(&mut self, event: PowerEvent) -> Result<bool> {
        match event {
            PowerEvent::Suspend
                if self.state == ServiceState::Running && self.options.pause_continue =>
            {
                self.pause()?;
                self.suspended = true;
                Ok(true)
            }
            e if e.is_resume() && self.suspended && self.state == ServiceState::Paused => {
                self.resume()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Observe a worker that exited on its own.
    ///
    /// A faulted worker forces `Stopped` and the fault is returned once.
    pub fn check_worker(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Ok(());
        }
        let Some(handle) = self.worker.as_mut() else {
            return Ok(());
        };

        match handle.try_join() {
            None => Ok(()),
            Some(Ok(())) => {
                self.worker = None;
                self.apply(LifecycleEvent::StopRequested)?;
                self.apply(LifecycleEvent::StopCompleted)?;
                Ok(())
            }
            Some(Err(e)) => {
                self.worker = None;
                self.fail(as_fault(e))
            }
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            state: self.state,
            controls_accepted: self.controls_accepted(),
            checkpoint: self.checkpoint,
            wait_hint: if self.state.is_pending() {
                self.options.wait_hint
            } else {
                Duration::ZERO
            },
            exit_code: self.exit_code,
        }
    }

    /// Publish the current status and return it
    pub fn report_status(&self) -> ServiceStatus {
        let status = self.status();
        self.reporter.report(&status);
        status
    }

    fn controls_accepted(&self) -> ControlsAccepted {
        if !self.state.is_active() {
            return ControlsAccepted::empty();
        }

        let mut controls = ControlsAccepted::STOP;
        if self.options.pause_continue {
            controls |= ControlsAccepted::PAUSE_CONTINUE;
        }
        if self.options.accept_shutdown {
            controls |= ControlsAccepted::SHUTDOWN;
        }
        if self.options.accept_power_events {
            controls |= ControlsAccepted::POWER_EVENT;
        }
        controls
    }

    fn heartbeat(&mut self) {
        self.checkpoint = self.checkpoint.saturating_add(1);
        self.report_status();
    }

    /// Force `Stopped` and hand the error back
    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.worker = None;
        self.apply(LifecycleEvent::ErrorOccurred(err.to_string()))?;
        Err(err)
    }
}

impl Drop for LifecycleMachine {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.abandon();
        }
    }
}

impl std::fmt::Debug for LifecycleMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleMachine")
            .field("state", &self.state)
            .field("checkpoint", &self.checkpoint)
            .field("exit_code", &self.exit_code)
            .field("options", &self.options)
            .finish()
    }
}

fn as_fault(err: Error) -> Error {
    match err {
        Error::WorkerFault(_) => err,
        other => Error::worker_fault(other.to_string()),
    }
}
