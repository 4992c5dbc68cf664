//! Configuration schema for relate

use anyhow::{Context, Result};
use relate_core::{EnvPaths, EnvironmentConfig, EnvironmentKind, RegistryConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::DEFAULT_ENVIRONMENT;

/// Main configuration structure
///
/// All fields default so a missing or partial file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_environment: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, EnvironmentEntry>,
}

/// One named environment as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    #[serde(rename = "type")]
    pub kind: EnvironmentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_versions_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_registry: Option<RegistryConfig>,
}

impl EnvironmentEntry {
    pub fn local() -> Self {
        Self {
            kind: EnvironmentKind::Local,
            user: None,
            remote_url: None,
            dist_versions_url: None,
            extension_registry: None,
        }
    }
}

impl RelateConfig {
    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(default) = &self.default_environment {
            if default != DEFAULT_ENVIRONMENT && !self.environments.contains_key(default) {
                errors.push(format!(
                    "default_environment '{}' is not a configured environment",
                    default
                ));
            }
        }

        for (id, entry) in &self.environments {
            if let Err(e) = validate_identifier(id) {
                errors.push(e);
            }
            if entry.kind == EnvironmentKind::Remote && entry.remote_url.is_none() {
                errors.push(format!("Remote environment '{}' needs a remote_url", id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Id used when the caller does not name one.
    pub fn default_id(&self) -> &str {
        self.default_environment
            .as_deref()
            .unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// Every environment id, including the implicit local default.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.environments.keys().cloned().collect();
        if !self.environments.contains_key(DEFAULT_ENVIRONMENT) {
            ids.insert(0, DEFAULT_ENVIRONMENT.to_string());
        }
        ids
    }

    /// Build the runtime configuration of `requested`, or of the default.
    pub fn resolve(&self, requested: Option<&str>, paths: &EnvPaths) -> Result<EnvironmentConfig> {
        let id = requested.unwrap_or_else(|| self.default_id());

        let entry = match self.environments.get(id) {
            Some(entry) => entry.clone(),
            None if id == DEFAULT_ENVIRONMENT => EnvironmentEntry::local(),
            None => anyhow::bail!(
                "Environment '{}' not found. Known environments: {}",
                id,
                self.ids().join(", ")
            ),
        };

        let mut builder = EnvironmentConfig::builder(id, paths.clone()).kind(entry.kind);
        if let Some(user) = entry.user {
            builder = builder.user(user);
        }
        if let Some(url) = entry.remote_url {
            builder = builder.remote_url(url);
        }
        if let Some(url) = entry.dist_versions_url {
            builder = builder.dist_versions_url(url);
        }
        if let Some(registry) = entry.extension_registry {
            builder = builder.extension_registry(registry);
        }

        builder
            .build()
            .with_context(|| format!("Invalid environment '{}'", id))
    }
}

/// Environment ids must be non-empty and contain only alphanumeric
/// characters, hyphens, or underscores.
pub fn validate_identifier(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("environment id cannot be empty".to_string());
    }
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!(
            "environment id '{}' must contain only alphanumeric characters, hyphens, or underscores",
            id
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn remote(url: Option<&str>) -> EnvironmentEntry {
        EnvironmentEntry {
            kind: EnvironmentKind::Remote,
            remote_url: url.map(str::to_string),
            ..EnvironmentEntry::local()
        }
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = RelateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_id(), "default");
        assert_eq!(config.ids(), vec!["default"]);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = RelateConfig {
            default_environment: Some("missing".to_string()),
            ..RelateConfig::default()
        };
        config.environments.insert("cloud".to_string(), remote(None));
        config.environments.insert("bad id".to_string(), EnvironmentEntry::local());

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("missing")));
        assert!(errors.iter().any(|e| e.contains("remote_url")));
        assert!(errors.iter().any(|e| e.contains("bad id")));
    }

    #[test]
    fn test_parse_toml() {
        let config: RelateConfig = toml::from_str(
            r#"
default_environment = "cloud"

[environments.cloud]
type = "remote"
remote_url = "https://relate.example.com"

[environments.work]
type = "local"
dist_versions_url = "https://mirror.example.com/versions.json"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.default_id(), "cloud");
        assert_eq!(config.ids(), vec!["default", "cloud", "work"]);
    }

    #[test]
    fn test_resolve() {
        let paths = EnvPaths::under(Path::new("/tmp/relate-test"));
        let mut config = RelateConfig::default();
        config.environments.insert(
            "work".to_string(),
            EnvironmentEntry {
                dist_versions_url: Some("https://mirror.example.com/versions.json".to_string()),
                ..EnvironmentEntry::local()
            },
        );
        config
            .environments
            .insert("cloud".to_string(), remote(Some("https://relate.example.com")));

        let default = config.resolve(None, &paths).unwrap();
        assert_eq!(default.id(), "default");
        assert_eq!(default.kind(), EnvironmentKind::Local);

        let work = config.resolve(Some("work"), &paths).unwrap();
        assert_eq!(work.dist_versions_url(), "https://mirror.example.com/versions.json");

        let cloud = config.resolve(Some("cloud"), &paths).unwrap();
        assert_eq!(cloud.remote_url(), Some("https://relate.example.com"));

        let err = config.resolve(Some("nope"), &paths).unwrap_err();
        assert!(err.to_string().contains("Environment 'nope' not found"));
    }
}
