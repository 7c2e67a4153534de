//! Profile management command implementations

use crate::cli::{OutputFormat, ProfileCommands};
use crate::error::{LakectlError, Result};
use crate::output;
use colored::Colorize;
use lakectl_core::{Config, ConfigError, Profile};
use serde_json::json;
use std::path::Path;
use tracing::debug;

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    config: &Config,
    config_path: Option<&Path>,
    output_format: OutputFormat,
) -> Result<()> {
    match profile_cmd {
        ProfileCommands::List => handle_list(config, config_path, output_format),
        ProfileCommands::Show { name } => handle_show(config, name.as_deref(), output_format),
        ProfileCommands::Set {
            name,
            host,
            token,
            account_host,
            account_id,
            default,
        } => handle_set(
            config,
            config_path,
            name,
            host.as_deref(),
            token.as_deref(),
            account_host.as_deref(),
            account_id.as_deref(),
            *default,
        ),
        ProfileCommands::Remove { name } => handle_remove(config, config_path, name),
    }
}

fn resolved_config_path(config_path: Option<&Path>) -> Option<String> {
    config_path
        .map(|p| p.display().to_string())
        .or_else(|| Config::config_path().ok().map(|p| p.display().to_string()))
}

fn profile_json(name: &str, profile: &Profile, is_default: bool) -> serde_json::Value {
    json!({
        "name": name,
        "host": profile.host,
        "account_host": profile.account_host,
        "account_id": profile.account_id,
        "token_configured": profile.token.is_some(),
        "is_default": is_default,
    })
}

fn handle_list(
    config: &Config,
    config_path: Option<&Path>,
    output_format: OutputFormat,
) -> Result<()> {
    debug!("Listing all configured profiles");
    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();

    let profiles: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            let is_default = config.default_profile.as_deref() == Some(name.as_str());
            profile_json(name, &config.profiles[*name], is_default)
        })
        .collect();

    let output_data = json!({
        "config_path": resolved_config_path(config_path),
        "profiles": profiles,
        "count": names.len(),
    });
    output::print_value(&output_data, output_format)
}

fn handle_show(config: &Config, name: Option<&str>, output_format: OutputFormat) -> Result<()> {
    let name = match name {
        Some(n) => n.to_string(),
        None => config
            .profile_name(None, true)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: "default".to_string(),
            })?,
    };
    let profile = config
        .profiles
        .get(&name)
        .ok_or(ConfigError::ProfileNotFound { name: name.clone() })?;

    let is_default = config.default_profile.as_deref() == Some(name.as_str());
    output::print_value(&profile_json(&name, profile, is_default), output_format)
}

#[allow(clippy::too_many_arguments)]
fn handle_set(
    config: &Config,
    config_path: Option<&Path>,
    name: &str,
    host: Option<&str>,
    token: Option<&str>,
    account_host: Option<&str>,
    account_id: Option<&str>,
    default: bool,
) -> Result<()> {
    debug!("Setting profile: {}", name);

    // Merge over the existing profile so a partial update keeps the rest.
    let existing = config.profiles.get(name).cloned().unwrap_or_default();
    let profile = Profile {
        host: host.map(str::to_string).or(existing.host),
        token: token.map(str::to_string).or(existing.token),
        account_host: account_host.map(str::to_string).or(existing.account_host),
        account_id: account_id.map(str::to_string).or(existing.account_id),
        resilience: existing.resilience,
    };

    let mut config = config.clone();
    let is_first = config.profiles.is_empty();
    config.set_profile(name.to_string(), profile);
    if default || is_first {
        config.default_profile = Some(name.to_string());
    }

    save(&config, config_path)?;
    println!("Profile '{}' saved.", name.bold().cyan());
    if config.default_profile.as_deref() == Some(name) {
        println!("Set as the default profile.");
    }
    Ok(())
}

fn handle_remove(config: &Config, config_path: Option<&Path>, name: &str) -> Result<()> {
    debug!("Removing profile: {}", name);

    let mut config = config.clone();
    if config.remove_profile(name).is_none() {
        return Err(LakectlError::Config(ConfigError::ProfileNotFound {
            name: name.to_string(),
        }));
    }

    save(&config, config_path)?;
    println!("Profile '{}' removed.", name);
    Ok(())
}

fn save(config: &Config, config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => config.save_to_path(path)?,
        None => config.save()?,
    }
    Ok(())
}
