//! Service status published to the control manager

use bitflags::bitflags;
use std::time::Duration;

use crate::state::ServiceState;

bitflags! {
    /// Control requests a service accepts in its current state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlsAccepted: u32 {
        /// Stop requests
        const STOP = 0x0000_0001;
        /// Pause and continue requests
        const PAUSE_CONTINUE = 0x0000_0002;
        /// System shutdown notification
        const SHUTDOWN = 0x0000_0004;
        /// Power events (suspend/resume)
        const POWER_EVENT = 0x0000_0040;
    }
}

/// Snapshot of the service status
///
/// Owned by the lifecycle machine; a copy is handed to the
/// [`StatusReporter`] on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Current state
    pub state: ServiceState,
    /// Controls accepted in this state
    pub controls_accepted: ControlsAccepted,
    /// Progress counter for pending states, zero otherwise
    pub checkpoint: u32,
    /// Time the pending operation may take before it is considered hung
    pub wait_hint: Duration,
    /// Exit code, non-zero after a failure
    pub exit_code: u32,
}

impl ServiceStatus {
    /// Status of a freshly created service
    pub fn stopped() -> Self {
        Self {
            state: ServiceState::Stopped,
            controls_accepted: ControlsAccepted::empty(),
            checkpoint: 0,
            wait_hint: Duration::ZERO,
            exit_code: 0,
        }
    }
}

/// Receives status updates from the lifecycle machine
///
/// The Windows host forwards them to `SetServiceStatus`; tests record them.
pub trait StatusReporter: Send {
    /// Publish a status snapshot
    fn report(&self, status: &ServiceStatus);
}

/// Reporter that discards every update (console mode)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl StatusReporter for NoopReporter {
    fn report(&self, _status: &ServiceStatus) {}
}

impl<F> StatusReporter for F
where
    F: Fn(&ServiceStatus) + Send,
{
    fn report(&self, status: &ServiceStatus) {
        self(status)
    }
}
