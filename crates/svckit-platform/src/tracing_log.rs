//! Event log backed by `tracing`

use svckit_core::EventLog;
use tracing::info;

/// Writes event log entries as `tracing` events.
///
/// Used in console mode and wherever the system event log is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn write_entry(&self, source: &str, text: &str) {
        info!(target: "svckit::event_log", source = source, "{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_entry_without_subscriber() {
        TracingEventLog.write_entry("DemoService", "In OnStart");
    }
}
