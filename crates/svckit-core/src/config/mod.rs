//! Configuration management for svckit
//!
//! Provides a strongly-typed configuration system with TOML support.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};

/// Default wait hint for pending states, in seconds
pub const DEFAULT_WAIT_HINT_SECS: u64 = 100;
/// Default interval between work units, in milliseconds
pub const DEFAULT_WORK_INTERVAL_MS: u64 = 1000;
/// Default time the CLI waits for start/stop to settle, in seconds
pub const DEFAULT_CONTROL_TIMEOUT_SECS: u64 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service identity
    pub service: ServiceDescriptor,

    /// Lifecycle timing and capabilities
    pub lifecycle: LifecycleConfig,

    /// Event log settings
    pub event_log: EventLogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;

        if self.lifecycle.wait_hint_secs == 0 {
            return Err(Error::config_value(
                "lifecycle.wait_hint_secs",
                "Must be greater than zero",
            ));
        }
        if self.lifecycle.work_interval_ms == 0 {
            return Err(Error::config_value(
                "lifecycle.work_interval_ms",
                "Must be greater than zero",
            ));
        }
        if self.lifecycle.heartbeat_ms == 0 {
            return Err(Error::config_value(
                "lifecycle.heartbeat_ms",
                "Must be greater than zero",
            ));
        }
        if self.lifecycle.control_timeout_secs == 0 {
            return Err(Error::config_value(
                "lifecycle.control_timeout_secs",
                "Must be greater than zero",
            ));
        }
        if self.event_log.enabled && self.event_log.log_name.trim().is_empty() {
            return Err(Error::config_value("event_log.log_name", "Must not be empty"));
        }

        Ok(())
    }

    /// Event source name for this service
    pub fn event_source(&self) -> String {
        format!("{}{}", self.service.name, self.event_log.source_suffix)
    }
}

/// Lifecycle timing and optional capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Wait hint reported while in a pending state
    pub wait_hint_secs: u64,
    /// Interval between work units
    pub work_interval_ms: u64,
    /// Interval between heartbeats while waiting for the worker
    pub heartbeat_ms: u64,
    /// How long `start`/`stop` from the CLI wait for the target state
    pub control_timeout_secs: u64,
    /// Accept pause and continue requests
    pub pause_continue: bool,
    /// Accept system shutdown notifications
    pub accept_shutdown: bool,
    /// Accept power events
    pub accept_power_events: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            wait_hint_secs: DEFAULT_WAIT_HINT_SECS,
            work_interval_ms: DEFAULT_WORK_INTERVAL_MS,
            heartbeat_ms: 1000,
            control_timeout_secs: DEFAULT_CONTROL_TIMEOUT_SECS,
            pause_continue: false,
            accept_shutdown: true,
            accept_power_events: true,
        }
    }
}

impl LifecycleConfig {
    /// Wait hint as a duration
    pub fn wait_hint(&self) -> Duration {
        Duration::from_secs(self.wait_hint_secs)
    }

    /// Work interval as a duration
    pub fn work_interval(&self) -> Duration {
        Duration::from_millis(self.work_interval_ms)
    }

    /// Heartbeat interval as a duration
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    /// CLI control timeout as a duration
    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }
}

/// Event log configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Write lifecycle entries to the event log
    pub enabled: bool,
    /// Suffix appended to the service name to form the event source
    pub source_suffix: String,
    /// Log the source is registered under
    pub log_name: String,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_suffix: "Service".to_string(),
            log_name: "Application".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lifecycle.wait_hint(), Duration::from_secs(100));
        assert_eq!(config.lifecycle.work_interval(), Duration::from_secs(1));
        assert_eq!(config.lifecycle.control_timeout(), Duration::from_secs(10));
        assert!(!config.lifecycle.pause_continue);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [service]
            name = "Demo"
            startup = "automatic-delayed"
            account = "network-service"

            [lifecycle]
            pause_continue = true
            "#,
        )
        .unwrap();

        assert_eq!(config.service.name, "Demo");
        assert_eq!(
            config.service.startup,
            crate::descriptor::StartupMode::AutomaticDelayed
        );
        assert_eq!(config.service.account, crate::descriptor::Account::NetworkService);
        assert!(config.lifecycle.pause_continue);
        assert_eq!(config.lifecycle.wait_hint_secs, DEFAULT_WAIT_HINT_SECS);
    }

    #[test]
    fn test_user_account_toml() {
        let config = Config::from_toml(
            r#"
            [service.account.user]
            username = ".\\svc"
            password = "pw"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.account.account_name(), Some(".\\svc"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.lifecycle.work_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("work_interval_ms"));
    }

    #[test]
    fn test_event_source() {
        let mut config = Config::default();
        config.service.name = "Demo".into();
        assert_eq!(config.event_source(), "DemoService");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_save_and_load_file() {
        let mut config = Config::default();
        config.service.name = "FileDemo".into();
        config.lifecycle.control_timeout_secs = 30;

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), config.to_toml().unwrap()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
