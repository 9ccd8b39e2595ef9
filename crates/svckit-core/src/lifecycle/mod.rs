//! Service lifecycle state machine
//!
//! [`LifecycleMachine`] owns the service state and the worker thread. All
//! state changes go through [`LifecycleMachine::apply`]; the higher level
//! operations (`start`, `stop`, `pause`, ...) are built on it. The machine
//! never logs: it returns typed outcomes and publishes status through a
//! [`StatusReporter`](crate::status::StatusReporter).

mod machine;
mod power;

pub use machine::LifecycleMachine;
pub use power::PowerEvent;

use std::time::Duration;

use crate::config::LifecycleConfig;

/// Timing and capabilities of a lifecycle machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Wait hint for pending states; also bounds worker init and join
    pub wait_hint: Duration,
    /// Interval between work units
    pub work_interval: Duration,
    /// Interval between heartbeats while waiting on the worker
    pub heartbeat: Duration,
    /// Pause/continue capability
    pub pause_continue: bool,
    /// Accept shutdown notifications
    pub accept_shutdown: bool,
    /// Accept power events
    pub accept_power_events: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

impl From<&LifecycleConfig> for LifecycleOptions {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            wait_hint: config.wait_hint(),
            work_interval: config.work_interval(),
            heartbeat: config.heartbeat(),
            pause_continue: config.pause_continue,
            accept_shutdown: config.accept_shutdown,
            accept_power_events: config.accept_power_events,
        }
    }
}

impl LifecycleOptions {
    /// Enable or disable pause/continue
    pub fn with_pause_continue(mut self, enabled: bool) -> Self {
        self.pause_continue = enabled;
        self
    }

    /// Set the work interval
    pub fn with_work_interval(mut self, interval: Duration) -> Self {
        self.work_interval = interval;
        self
    }

    /// Set the wait hint
    pub fn with_wait_hint(mut self, wait_hint: Duration) -> Self {
        self.wait_hint = wait_hint;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}
