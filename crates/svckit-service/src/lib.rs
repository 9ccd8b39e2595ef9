//! svckit Service Host
//!
//! Connects the Service Control Manager to the lifecycle machine:
//! control requests become calls on a [`ServiceHost`], and status changes
//! flow back through a status reporter.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod host;
mod worker;

pub use host::{ControlRequest, ServiceHost};
pub use worker::{heartbeat_factory, HeartbeatWorker};

#[cfg(windows)]
pub mod service;

#[cfg(windows)]
pub use service::run;
