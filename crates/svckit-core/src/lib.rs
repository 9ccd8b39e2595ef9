//! # svckit Core
//!
//! Platform-independent core of a Windows service template.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Lifecycle machine** - service state, legal transitions and the worker thread
//! - **Worker loop** - cooperative polling loop with a cancellation token
//! - **Controller** - install/start/stop/uninstall/console command handling
//! - **Configuration** - service descriptor and timing settings in TOML
//!
//! The operating system is reached only through the traits in [`host`] and
//! [`status::StatusReporter`], so everything here runs and tests anywhere.
//!
//! ## Example
//!
//! ```rust,no_run
//! use svckit_core::{LifecycleMachine, LifecycleOptions, Worker};
//!
//! struct Tick;
//!
//! impl Worker for Tick {
//!     fn run_once(&mut self) -> svckit_core::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let factory = || -> Box<dyn Worker> { Box::new(Tick) };
//! let mut machine = LifecycleMachine::new(factory, LifecycleOptions::default());
//! machine.start()?;
//! machine.stop()?;
//! # Ok::<(), svckit_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod state;
pub mod status;
pub mod worker;

// Re-exports for convenience
pub use config::Config;
pub use controller::{CommandSet, ControlCommand, Controller, ExecutionReport};
pub use descriptor::{Account, Credentials, ServiceDescriptor, StartupMode};
pub use error::{Error, Result};
pub use host::{EventLog, InstallStatus, NullEventLog, PrivilegeCheck, ServiceRegistry};
pub use lifecycle::{LifecycleMachine, LifecycleOptions, PowerEvent};
pub use state::{LifecycleEvent, ServiceState};
pub use status::{ControlsAccepted, ServiceStatus, StatusReporter};
pub use worker::{CancellationToken, Worker, WorkerFactory};
