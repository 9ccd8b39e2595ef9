//! svckit Platform Layer
//!
//! Operating system bindings for the traits defined in `svckit_core::host`.
//!
//! ## Supported Platforms
//!
//! - **Windows**: Service Control Manager via `windows-service`, token
//!   elevation and the Application event log via `winapi`
//! - **Everywhere else**: only [`TracingEventLog`]; service management is
//!   unavailable

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

mod tracing_log;
pub use tracing_log::TracingEventLog;

#[cfg(windows)]
pub mod windows;

#[cfg(windows)]
pub use windows::{TokenPrivilegeCheck, WindowsEventLog, WindowsServiceRegistry};
