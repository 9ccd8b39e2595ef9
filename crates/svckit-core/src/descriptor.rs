//! Service identity used for registration with the control manager

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Maximum length of service and display names accepted by the SCM
pub const MAX_NAME_LEN: usize = 256;

/// How the service is started by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartupMode {
    /// Started at boot
    #[default]
    Automatic,
    /// Started shortly after boot
    AutomaticDelayed,
    /// Started on demand
    Manual,
    /// Cannot be started
    Disabled,
}

/// Username and password for a user account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name, e.g. `DOMAIN\user` or `.\user`
    pub username: String,
    /// Account password
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Account the service process runs under
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Account {
    /// Built-in SYSTEM account
    #[default]
    LocalSystem,
    /// Built-in low-privilege local account
    LocalService,
    /// Built-in account with network credentials
    NetworkService,
    /// A specific user
    User(Credentials),
}

impl Account {
    /// Account name as passed to the SCM; `None` means LocalSystem
    pub fn account_name(&self) -> Option<&str> {
        match self {
            Self::LocalSystem => None,
            Self::LocalService => Some("NT AUTHORITY\\LocalService"),
            Self::NetworkService => Some("NT AUTHORITY\\NetworkService"),
            Self::User(creds) => Some(&creds.username),
        }
    }

    /// Password passed to the SCM, only for user accounts
    pub fn password(&self) -> Option<&str> {
        match self {
            Self::User(creds) => Some(&creds.password),
            _ => None,
        }
    }
}

/// Immutable identity of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDescriptor {
    /// Unique key used for registration and control lookups
    pub name: String,
    /// Name shown in the services console
    pub display_name: String,
    /// Description shown in the services console
    pub description: String,
    /// Startup mode
    pub startup: StartupMode,
    /// Account the service runs as
    pub account: Account,
}

impl Default for ServiceDescriptor {
    fn default() -> Self {
        Self {
            name: "SvckitService".to_string(),
            display_name: "Svckit Service".to_string(),
            description: "Background service built from the svckit template".to_string(),
            startup: StartupMode::Automatic,
            account: Account::LocalSystem,
        }
    }
}

impl ServiceDescriptor {
    /// Descriptor with the given name; display name defaults to the name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            ..Default::default()
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the startup mode
    pub fn with_startup(mut self, startup: StartupMode) -> Self {
        self.startup = startup;
        self
    }

    /// Set the account
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = account;
        self
    }

    /// Validate the descriptor
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config_value("service.name", "Must not be empty"));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(Error::config_value(
                "service.name",
                format!("Must be at most {MAX_NAME_LEN} characters"),
            ));
        }
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(Error::config_value(
                "service.name",
                "Must not contain '/' or '\\'",
            ));
        }
        if self.display_name.len() > MAX_NAME_LEN {
            return Err(Error::config_value(
                "service.display_name",
                format!("Must be at most {MAX_NAME_LEN} characters"),
            ));
        }
        if let Account::User(creds) = &self.account {
            if creds.username.trim().is_empty() {
                return Err(Error::config_value(
                    "service.account.user.username",
                    "Must not be empty",
                ));
            }
        }
        Ok(())
    }
}
