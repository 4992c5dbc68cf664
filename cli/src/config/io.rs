//! Reading and writing `config.toml`. Every write is validated first.

use super::schema::{EnvironmentEntry, RelateConfig, validate_identifier};
use anyhow::{Context, Result};
use relate_core::EnvPaths;
use std::fs;
use std::path::PathBuf;

/// `<config>/config.toml`
pub fn get_config_path(paths: &EnvPaths) -> PathBuf {
    paths.config.join("config.toml")
}

/// A missing file yields an empty config with no environments.
pub fn load_config(paths: &EnvPaths) -> Result<RelateConfig> {
    let path = get_config_path(paths);

    if !path.exists() {
        return Ok(RelateConfig::default());
    }

    let content =
        fs::read_to_string(&path).context(format!("Failed to read config: {}", path.display()))?;

    let config: RelateConfig =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Config validation failed in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }

    Ok(config)
}

/// An invalid config is rejected before anything is written.
pub fn save_config(paths: &EnvPaths, config: &RelateConfig) -> Result<()> {
    if let Err(errors) = config.validate() {
        anyhow::bail!("cannot save invalid config:\n  {}", errors.join("\n  "));
    }

    let path = get_config_path(paths);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!(
            "Failed to create config directory: {}",
            parent.display()
        ))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, content).context(format!("Failed to write config: {}", path.display()))?;

    Ok(())
}

pub fn update_config<F>(paths: &EnvPaths, f: F) -> Result<()>
where
    F: FnOnce(&mut RelateConfig) -> Result<()>,
{
    let mut config = load_config(paths)?;
    f(&mut config)?;
    save_config(paths, &config)?;
    Ok(())
}

/// Add a named environment. Existing ids are not overwritten.
pub fn add_environment(paths: &EnvPaths, id: &str, entry: EnvironmentEntry) -> Result<()> {
    validate_identifier(id).map_err(anyhow::Error::msg)?;

    update_config(paths, |config| {
        if config.environments.contains_key(id) {
            anyhow::bail!("environment '{}' already exists", id);
        }
        config.environments.insert(id.to_string(), entry);
        Ok(())
    })
}

/// Make `id` the environment used when `--environment` is not given.
pub fn set_default_environment(paths: &EnvPaths, id: &str) -> Result<()> {
    update_config(paths, |config| {
        if !config.ids().iter().any(|known| known == id) {
            anyhow::bail!("environment '{}' not found", id);
        }
        config.default_environment = Some(id.to_string());
        Ok(())
    })
}
