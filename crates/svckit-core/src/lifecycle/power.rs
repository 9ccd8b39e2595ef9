//! Power management notifications

/// Power event delivered by the control manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// The system asks whether it may suspend
    QuerySuspend,
    /// The system is about to suspend
    Suspend,
    /// Resumed after a suspend, user present
    ResumeSuspend,
    /// Resumed after a suspend, unattended
    ResumeAutomatic,
    /// Resumed after a critical suspend (battery)
    ResumeCritical,
    /// Battery is low
    BatteryLow,
    /// AC/battery status changed
    PowerStatusChange,
    /// Anything else, with the raw event code
    Other(u32),
}

impl PowerEvent {
    /// Whether this event signals the end of a suspend
    pub fn is_resume(self) -> bool {
        matches!(
            self,
            Self::ResumeSuspend | Self::ResumeAutomatic | Self::ResumeCritical
        )
    }
}
