//! Configuration lookup and command-line overrides

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use svckit_core::{Account, Config, Credentials};
use tracing::debug;

use crate::args::{AccountArg, Args};

/// File name searched next to the executable and in the user config dir
pub const CONFIG_FILE_NAME: &str = "svckit.toml";

/// Configuration in effect for this invocation
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Merged configuration
    pub config: Config,
    /// File it was read from, if any
    pub path: Option<PathBuf>,
}

/// Load the configuration, apply command-line overrides and validate.
///
/// An explicit `--config` file must exist. Without one, `svckit.toml` next
/// to the executable is used, then the one in the user config directory,
/// then built-in defaults.
pub fn load(args: &Args) -> Result<Loaded> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };

    let mut config = match &path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            debug!("No configuration file found, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, args)?;
    config.validate().context("Configuration validation failed")?;

    Ok(Loaded { config, path })
}

fn find_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "svckit") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Apply command-line options on top of file values
pub fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    let service = &mut config.service;

    if let Some(name) = &args.name {
        service.name.clone_from(name);
    }
    if let Some(display_name) = &args.display_name {
        service.display_name.clone_from(display_name);
    }
    if let Some(description) = &args.description {
        service.description.clone_from(description);
    }
    if let Some(startup) = args.startup {
        service.startup = startup.into();
    }

    let account = match args.account {
        Some(AccountArg::LocalSystem) => Some(Account::LocalSystem),
        Some(AccountArg::LocalService) => Some(Account::LocalService),
        Some(AccountArg::NetworkService) => Some(Account::NetworkService),
        Some(AccountArg::User) => {
            let username = args
                .username
                .clone()
                .context("--account user requires --username")?;
            Some(user_account(username, args.password.clone()))
        }
        // A bare --username implies a user account
        None => args
            .username
            .clone()
            .map(|username| user_account(username, args.password.clone())),
    };
    if let Some(account) = account {
        service.account = account;
    }

    Ok(())
}

fn user_account(username: String, password: Option<String>) -> Account {
    Account::User(Credentials {
        username,
        password: password.unwrap_or_default(),
    })
}
