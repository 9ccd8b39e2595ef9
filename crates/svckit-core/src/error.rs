//! Error types for svckit-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use std::time::Duration;
use thiserror::Error;

use crate::state::ServiceState;

/// Main error type for svckit-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A privileged operation was attempted without elevation
    #[error("Permission denied: {operation} requires administrator privileges")]
    PermissionDenied {
        /// Operation that was refused
        operation: &'static str,
    },

    /// The service is not registered with the service control manager
    #[error("Service '{name}' is not installed")]
    NotInstalled {
        /// Service name
        name: String,
    },

    /// The service is already registered
    #[error("Service '{name}' is already installed")]
    AlreadyInstalled {
        /// Service name
        name: String,
    },

    /// The requested operation is not valid in the current state
    #[error("Invalid transition: {event} is not allowed while {from}")]
    InvalidTransition {
        /// State the machine was in
        from: ServiceState,
        /// Name of the rejected event
        event: &'static str,
    },

    /// A transition did not reach its target state in time
    #[error("Timed out after {waited:?} waiting for state {target} (last reported: {})",
        .last.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string))]
    Timeout {
        /// State that was expected
        target: ServiceState,
        /// How long we waited
        waited: Duration,
        /// Last state reported before giving up, if known
        last: Option<ServiceState>,
    },

    /// Pause/continue on an instance that does not advertise the capability
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation {
        /// Operation that was refused
        operation: &'static str,
    },

    /// The background worker failed
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// The background worker did not acknowledge cancellation in time
    #[error("Worker did not stop within {waited:?}")]
    WorkerStuck {
        /// How long the join waited
        waited: Duration,
    },

    /// Any other failure reported by the service registry
    #[error("Service registry error: {0}")]
    Registry(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid transition error
    pub fn invalid_transition(from: ServiceState, event: &'static str) -> Self {
        Self::InvalidTransition { from, event }
    }

    /// Create a not-installed error
    pub fn not_installed(name: impl Into<String>) -> Self {
        Self::NotInstalled { name: name.into() }
    }

    /// Create a worker fault error
    pub fn worker_fault(detail: impl Into<String>) -> Self {
        Self::WorkerFault(detail.into())
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the CLI should treat this as a soft condition
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}
