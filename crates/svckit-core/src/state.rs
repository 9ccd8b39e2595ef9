//! Service states, lifecycle events and the transition table

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of a service instance
///
/// Mirrors the states a service control manager understands. Exactly one is
/// active at a time; `Stopped` is both initial and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceState {
    /// Not running
    #[default]
    Stopped,
    /// Start requested, worker initializing
    StartPending,
    /// Worker running
    Running,
    /// Stop requested, waiting for the worker to finish
    StopPending,
    /// Running but not performing work
    Paused,
    /// Pause requested
    PausePending,
    /// Continue requested
    ContinuePending,
}

impl ServiceState {
    /// All states, in declaration order
    pub const ALL: [ServiceState; 7] = [
        ServiceState::Stopped,
        ServiceState::StartPending,
        ServiceState::Running,
        ServiceState::StopPending,
        ServiceState::Paused,
        ServiceState::PausePending,
        ServiceState::ContinuePending,
    ];

    /// Whether this is a transitional state that needs heartbeats
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::StartPending | Self::StopPending | Self::PausePending | Self::ContinuePending
        )
    }

    /// Whether the worker is alive in this state
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// State name as displayed to users
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::StartPending => "StartPending",
            Self::Running => "Running",
            Self::StopPending => "StopPending",
            Self::Paused => "Paused",
            Self::PausePending => "PausePending",
            Self::ContinuePending => "ContinuePending",
        }
    }

    /// Apply the transition table.
    ///
    /// Returns the next state, or `None` if the event is not allowed in this
    /// state. A stop request outside `Running`/`Paused` is a no-op and
    /// returns the current state.
    pub fn next(self, event: &LifecycleEvent) -> Option<ServiceState> {
        use LifecycleEvent as E;
        use ServiceState as S;

        match (self, event) {
            (_, E::ErrorOccurred(_)) => Some(S::Stopped),

            (S::Stopped, E::StartRequested) => Some(S::StartPending),
            (S::StartPending, E::StartCompleted) => Some(S::Running),

            (S::Running | S::Paused, E::StopRequested) => Some(S::StopPending),
            (state, E::StopRequested) => Some(state),
            (S::StopPending, E::StopCompleted) => Some(S::Stopped),

            (S::Running, E::PauseRequested) => Some(S::PausePending),
            (S::PausePending, E::PauseCompleted) => Some(S::Paused),

            (S::Paused, E::ContinueRequested) => Some(S::ContinuePending),
            (S::ContinuePending, E::ContinueCompleted) => Some(S::Running),

            _ => None,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the lifecycle machine
///
/// Produced by the controller or by the hosting service control manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Begin starting
    StartRequested,
    /// Worker initialized
    StartCompleted,
    /// Begin stopping
    StopRequested,
    /// Worker acknowledged cancellation
    StopCompleted,
    /// Begin pausing
    PauseRequested,
    /// Pause took effect
    PauseCompleted,
    /// Begin continuing
    ContinueRequested,
    /// Continue took effect
    ContinueCompleted,
    /// Unhandled failure; forces `Stopped`
    ErrorOccurred(String),
}

impl LifecycleEvent {
    /// Short event name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartRequested => "start",
            Self::StartCompleted => "start-completed",
            Self::StopRequested => "stop",
            Self::StopCompleted => "stop-completed",
            Self::PauseRequested => "pause",
            Self::PauseCompleted => "pause-completed",
            Self::ContinueRequested => "continue",
            Self::ContinueCompleted => "continue-completed",
            Self::ErrorOccurred(_) => "error",
        }
    }

    /// Whether this event belongs to the optional pause/continue capability
    pub fn needs_pause_continue(&self) -> bool {
        matches!(
            self,
            Self::PauseRequested | Self::PauseCompleted | Self::ContinueRequested | Self::ContinueCompleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = ServiceState::Stopped;
        let s = s.next(&LifecycleEvent::StartRequested).unwrap();
        assert_eq!(s, ServiceState::StartPending);
        let s = s.next(&LifecycleEvent::StartCompleted).unwrap();
        assert_eq!(s, ServiceState::Running);
        let s = s.next(&LifecycleEvent::StopRequested).unwrap();
        assert_eq!(s, ServiceState::StopPending);
        let s = s.next(&LifecycleEvent::StopCompleted).unwrap();
        assert_eq!(s, ServiceState::Stopped);
    }

    #[test]
    fn test_pause_continue_path() {
        let s = ServiceState::Running;
        let s = s.next(&LifecycleEvent::PauseRequested).unwrap();
        assert_eq!(s, ServiceState::PausePending);
        let s = s.next(&LifecycleEvent::PauseCompleted).unwrap();
        assert_eq!(s, ServiceState::Paused);
        let s = s.next(&LifecycleEvent::ContinueRequested).unwrap();
        assert_eq!(s, ServiceState::ContinuePending);
        let s = s.next(&LifecycleEvent::ContinueCompleted).unwrap();
        assert_eq!(s, ServiceState::Running);
    }

    #[test]
    fn test_stop_is_noop_outside_active_states() {
        for state in ServiceState::ALL {
            let next = state.next(&LifecycleEvent::StopRequested);
            if state.is_active() {
                assert_eq!(next, Some(ServiceState::StopPending));
            } else {
                assert_eq!(next, Some(state), "stop from {state} should be a no-op");
            }
        }
    }

    #[test]
    fn test_error_always_stops() {
        for state in ServiceState::ALL {
            let next = state.next(&LifecycleEvent::ErrorOccurred("boom".into()));
            assert_eq!(next, Some(ServiceState::Stopped));
        }
    }

    #[test]
    fn test_rejected_pairs() {
        assert_eq!(ServiceState::Stopped.next(&LifecycleEvent::PauseRequested), None);
        assert_eq!(ServiceState::Running.next(&LifecycleEvent::StartRequested), None);
        assert_eq!(ServiceState::Paused.next(&LifecycleEvent::PauseRequested), None);
        assert_eq!(ServiceState::Stopped.next(&LifecycleEvent::StopCompleted), None);
    }

    #[test]
    fn test_pending_states() {
        assert!(ServiceState::StartPending.is_pending());
        assert!(ServiceState::ContinuePending.is_pending());
        assert!(!ServiceState::Running.is_pending());
        assert!(!ServiceState::Stopped.is_pending());
    }
}
