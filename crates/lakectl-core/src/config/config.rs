//! Profile storage and resolution.
//!
//! Configuration is a TOML file of named profiles. A profile carries the
//! workspace host/token, optional account-console settings, and optional
//! resilience overrides. Resolution merges environment variables over the
//! selected profile; passing `use_env = false` (set when the caller pinned
//! an explicit config file) disables the environment layer entirely.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::resilience::ResilienceConfig;

pub const ENV_HOST: &str = "LAKEHOUSE_HOST";
pub const ENV_TOKEN: &str = "LAKEHOUSE_TOKEN";
pub const ENV_ACCOUNT_HOST: &str = "LAKEHOUSE_ACCOUNT_HOST";
pub const ENV_ACCOUNT_ID: &str = "LAKEHOUSE_ACCOUNT_ID";
pub const ENV_PROFILE: &str = "LAKECTL_PROFILE";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is named explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Profile {
    /// Workspace deployment URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Bearer token for both scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Account console URL (account-scoped operations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_host: Option<String>,
    /// Account identifier (account-scoped operations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Resilience overrides for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resilience: Option<ResilienceConfig>,
}

/// Fully resolved connection settings after profile + environment merge.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub host: Option<String>,
    pub token: Option<String>,
    pub account_host: Option<String>,
    pub account_id: Option<String>,
    pub resilience: ResilienceConfig,
}

impl Settings {
    /// Workspace host + token, or an actionable error.
    pub fn workspace(&self) -> Result<(&str, &str)> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| ConfigError::MissingWorkspaceHost {
                suggestion: format!("Set {ENV_HOST} or add 'host' to the profile"),
            })?;
        let token = self.token.as_deref().ok_or_else(|| ConfigError::MissingToken {
            suggestion: format!("Set {ENV_TOKEN} or add 'token' to the profile"),
        })?;
        Ok((host, token))
    }

    /// Account host + token + account id, or an actionable error.
    pub fn account(&self) -> Result<(&str, &str, &str)> {
        let token = self.token.as_deref().ok_or_else(|| ConfigError::MissingToken {
            suggestion: format!("Set {ENV_TOKEN} or add 'token' to the profile"),
        })?;
        match (self.account_host.as_deref(), self.account_id.as_deref()) {
            (Some(host), Some(id)) => Ok((host, token, id)),
            _ => Err(ConfigError::MissingAccountSettings {
                suggestion: format!(
                    "Set {ENV_ACCOUNT_HOST} and {ENV_ACCOUNT_ID} or add 'account_host' and 'account_id' to the profile"
                ),
            }),
        }
    }
}

impl Config {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Standard config file location
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "lakectl").ok_or(ConfigError::ConfigDirError)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed here
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// Which profile a resolution will use, without resolving it.
    pub fn profile_name(&self, explicit: Option<&str>, use_env: bool) -> Option<String> {
        if let Some(name) = explicit {
            return Some(name.to_string());
        }
        if use_env && let Ok(name) = std::env::var(ENV_PROFILE) {
            return Some(name);
        }
        if let Some(name) = &self.default_profile {
            return Some(name.clone());
        }
        if self.profiles.contains_key("default") {
            return Some("default".to_string());
        }
        None
    }

    /// Resolve connection settings: environment variables win over the
    /// selected profile unless `use_env` is off.
    pub fn resolve(&self, explicit: Option<&str>, use_env: bool) -> Result<Settings> {
        let profile = match self.profile_name(explicit, use_env) {
            Some(name) => {
                // An explicitly named profile must exist; a defaulted name
                // that is missing just means "no profile layer".
                match self.profiles.get(&name) {
                    Some(p) => p.clone(),
                    None if explicit.is_some() => {
                        return Err(ConfigError::ProfileNotFound { name });
                    }
                    None => Profile::default(),
                }
            }
            None => Profile::default(),
        };

        let env = |key: &str| -> Option<String> {
            if use_env { std::env::var(key).ok() } else { None }
        };

        Ok(Settings {
            host: env(ENV_HOST).or(profile.host),
            token: env(ENV_TOKEN).or(profile.token),
            account_host: env(ENV_ACCOUNT_HOST).or(profile.account_host),
            account_id: env(ENV_ACCOUNT_ID).or(profile.account_id),
            resilience: profile.resilience.unwrap_or_default(),
        })
    }
}
