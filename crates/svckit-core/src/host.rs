//! Interfaces to the hosting operating system
//!
//! These traits define what the controller needs from the platform.
//! `svckit-platform` provides the Windows implementations.

use std::time::Duration;

use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::state::ServiceState;

/// Registration state of a service as seen by the control manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// No service with that name is registered
    NotInstalled,
    /// Registered, currently in the given state
    Installed(ServiceState),
}

impl InstallStatus {
    /// Whether the service is registered
    pub fn is_installed(self) -> bool {
        matches!(self, Self::Installed(_))
    }
}

/// OS service-control registry
#[cfg_attr(test, mockall::automock)]
pub trait ServiceRegistry {
    /// Register a service
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<()>;

    /// Remove a service registration
    fn deregister(&self, name: &str) -> Result<()>;

    /// Look up a service
    fn query_status(&self, name: &str) -> Result<InstallStatus>;

    /// Ask the control manager to move the service to `target` and wait
    /// up to `timeout` for it to get there.
    ///
    /// Returns the reached state, or `Error::Timeout` carrying the last
    /// state the control manager reported.
    fn request_transition(
        &self,
        name: &str,
        target: ServiceState,
        timeout: Duration,
    ) -> Result<ServiceState>;
}

/// Privilege check for administrative operations
#[cfg_attr(test, mockall::automock)]
pub trait PrivilegeCheck {
    /// Whether the current process runs elevated
    fn is_elevated(&self) -> bool;
}

/// Diagnostic event log
///
/// Writes are best effort: implementations swallow their own failures.
#[cfg_attr(test, mockall::automock)]
pub trait EventLog: Send + Sync {
    /// Write an informational entry
    fn write_entry(&self, source: &str, text: &str);
}

/// Event log that drops every entry
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventLog;

impl EventLog for NullEventLog {
    fn write_entry(&self, _source: &str, _text: &str) {}
}
