//! Environment configuration
//!
//! One [`EnvironmentConfig`] is built per environment when the process starts
//! and handed to every component constructor. It is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RelateError, Result};
use crate::paths::EnvPaths;

/// Default index listing downloadable distributions.
pub const DEFAULT_DIST_VERSIONS_URL: &str = "https://dist.neo4j.org/versions.json";

/// Default extension registry search endpoint and repository.
pub const DEFAULT_EXTENSION_SEARCH_URL: &str =
    "https://neo4j.jfrog.io/neo4j/api/search/aql";
pub const DEFAULT_EXTENSION_DOWNLOAD_URL: &str = "https://neo4j.jfrog.io/neo4j";
pub const DEFAULT_EXTENSION_REPO: &str = "npm-local-private";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Local,
    Remote,
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentKind::Local => write!(f, "local"),
            EnvironmentKind::Remote => write!(f, "remote"),
        }
    }
}

/// Where extension packages are searched for and downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub search_url: String,
    pub download_url: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_EXTENSION_SEARCH_URL.to_string(),
            download_url: DEFAULT_EXTENSION_DOWNLOAD_URL.to_string(),
            repo: DEFAULT_EXTENSION_REPO.to_string(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    id: String,
    kind: EnvironmentKind,
    user: String,
    paths: EnvPaths,
    remote_url: Option<String>,
    dist_versions_url: String,
    extension_registry: RegistryConfig,
}

impl EnvironmentConfig {
    pub fn builder(id: impl Into<String>, paths: EnvPaths) -> EnvironmentConfigBuilder {
        EnvironmentConfigBuilder {
            id: id.into(),
            kind: EnvironmentKind::Local,
            user: None,
            paths,
            remote_url: None,
            dist_versions_url: None,
            extension_registry: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn paths(&self) -> &EnvPaths {
        &self.paths
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    pub fn dist_versions_url(&self) -> &str {
        &self.dist_versions_url
    }

    pub fn extension_registry(&self) -> &RegistryConfig {
        &self.extension_registry
    }
}

pub struct EnvironmentConfigBuilder {
    id: String,
    kind: EnvironmentKind,
    user: Option<String>,
    paths: EnvPaths,
    remote_url: Option<String>,
    dist_versions_url: Option<String>,
    extension_registry: Option<RegistryConfig>,
}

impl EnvironmentConfigBuilder {
    pub fn kind(mut self, kind: EnvironmentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    pub fn dist_versions_url(mut self, url: impl Into<String>) -> Self {
        self.dist_versions_url = Some(url.into());
        self
    }

    pub fn extension_registry(mut self, registry: RegistryConfig) -> Self {
        self.extension_registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<EnvironmentConfig> {
        if self.id.trim().is_empty() {
            return Err(RelateError::InvalidArgument(
                "Environment id cannot be empty".to_string(),
            ));
        }
        if self.kind == EnvironmentKind::Remote && self.remote_url.is_none() {
            return Err(RelateError::InvalidArgument(format!(
                "Remote environment '{}' requires a remote URL",
                self.id
            )));
        }

        Ok(EnvironmentConfig {
            id: self.id,
            kind: self.kind,
            user: self.user.unwrap_or_else(default_user),
            paths: self.paths,
            remote_url: self.remote_url,
            dist_versions_url: self
                .dist_versions_url
                .unwrap_or_else(|| DEFAULT_DIST_VERSIONS_URL.to_string()),
            extension_registry: self.extension_registry.unwrap_or_default(),
        })
    }
}

fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "relate".to_string())
}
