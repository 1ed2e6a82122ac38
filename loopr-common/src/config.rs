//! Configuration file resolution and TOML loading
//!
//! Config file resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`~/.config/<app>/config.toml` on Linux)
//! 4. System config (`/etc/<app>/config.toml`, Linux only)
//!
//! When nothing is found the caller falls back to compiled defaults. A missing
//! auto-discovered file is never an error; an explicitly requested file that
//! does not exist is.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
    SystemConfigDir,
}

/// Resolve the configuration file for `app_name`.
///
/// Returns `Ok(None)` when no file was requested and none was discovered.
///
/// # Errors
/// Returns `Error::Config` if the CLI argument or the environment variable
/// names a file that does not exist.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    app_name: &str,
) -> Result<Option<(PathBuf, ConfigSource)>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_existing(path.to_path_buf(), ConfigSource::CommandLine).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return require_existing(PathBuf::from(value), ConfigSource::Environment).map(Some);
        }
    }

    // Priority 3: user config dir
    if let Some(path) = dirs::config_dir().map(|d| d.join(app_name).join("config.toml")) {
        if path.exists() {
            return Ok(Some((path, ConfigSource::UserConfigDir)));
        }
    }

    // Priority 4: system config
    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc").join(app_name).join("config.toml");
        if system.exists() {
            return Ok(Some((system, ConfigSource::SystemConfigDir)));
        }
    }

    debug!("No config file found for {}", app_name);
    Ok(None)
}

fn require_existing(path: PathBuf, source: ConfigSource) -> Result<(PathBuf, ConfigSource)> {
    if path.exists() {
        Ok((path, source))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {} (from {:?})",
            path.display(),
            source
        )))
    }
}

/// Parse a TOML string into `T`.
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

/// Load `T` from a TOML file, or return `T::default()` when `path` is `None`.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let value = parse_toml(&content)?;
            info!("Loaded configuration from {}", path.display());
            Ok(value)
        }
        None => {
            warn!("No configuration file, using compiled defaults");
            Ok(T::default())
        }
    }
}
