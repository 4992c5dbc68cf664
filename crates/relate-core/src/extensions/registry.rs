use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::config::RegistryConfig;
use crate::constants::EXTENSION_NPM_PREFIX;
use crate::distributions::fetcher::save_response;
use crate::distributions::Origin;
use crate::error::{RelateError, Result};
use crate::version::coerce;

/// A version of an extension known locally or to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionVersion {
    pub name: String,
    pub version: String,
    pub origin: Origin,
}

/// Remote package registry holding extension tarballs.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync {
    /// All extension versions the registry publishes.
    async fn search(&self) -> Result<Vec<ExtensionVersion>>;

    /// Save the tarball of `name@version` at `dest`.
    async fn download(&self, name: &str, version: &str, dest: &Path) -> Result<()>;
}

/// One artifact in a search response; only the file name is used.
#[derive(Debug, Deserialize)]
pub struct RegistryItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RegistryItem>,
}

#[derive(Debug, Clone)]
pub struct HttpExtensionRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl HttpExtensionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    fn tarball_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/{}/{}{}/-/{}-{}.tgz",
            self.config.download_url.trim_end_matches('/'),
            self.config.repo,
            EXTENSION_NPM_PREFIX,
            name,
            name,
            version
        )
    }
}

/// Query body selecting every scoped extension package in `repo`.
pub fn search_query(repo: &str) -> String {
    let search = serde_json::json!({
        "path": { "$match": format!("{}*", EXTENSION_NPM_PREFIX) },
        "repo": { "$eq": repo },
    });
    format!("items.find({})", search)
}

/// Turn artifact file names like `graph-app-1.2.0.tgz` into versions.
///
/// The version is the first `-` separated suffix that is valid semver, so
/// prereleases keep their full version (`graph-app-1.0.0-beta.1`). Otherwise
/// the last segment is coerced and the name is whatever precedes
/// `-<coerced>`. Names without a recognisable version are dropped.
pub fn map_registry_response(items: &[RegistryItem]) -> Vec<ExtensionVersion> {
    items
        .iter()
        .filter_map(|item| {
            let stem = item.name.strip_suffix(".tgz").unwrap_or(&item.name);
            let (name, version) = split_strict(stem).or_else(|| split_coerced(stem))?;
            if name.is_empty() {
                return None;
            }
            Some(ExtensionVersion {
                name: name.to_string(),
                version,
                origin: Origin::Online,
            })
        })
        .collect()
}

fn split_strict(stem: &str) -> Option<(&str, String)> {
    stem.match_indices('-')
        .map(|(at, _)| (&stem[..at], &stem[at + 1..]))
        .find(|(_, rest)| semver::Version::parse(rest).is_ok())
        .map(|(name, rest)| (name, rest.to_string()))
}

fn split_coerced(stem: &str) -> Option<(&str, String)> {
    let (head, last) = stem.rsplit_once('-')?;
    let version = coerce(last)?.to_string();
    let name = stem
        .split_once(&format!("-{}", version))
        .map_or(head, |(name, _)| name);
    Some((name, version))
}

#[async_trait]
impl ExtensionRegistry for HttpExtensionRegistry {
    #[instrument(skip(self), fields(url = %self.config.search_url))]
    async fn search(&self) -> Result<Vec<ExtensionVersion>> {
        let request = self
            .client
            .post(&self.config.search_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(search_query(&self.config.repo));

        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelateError::Transport(format!(
                "{} returned status {}",
                self.config.search_url, status
            )));
        }

        let body: SearchResponse = response.json().await?;
        let versions = map_registry_response(&body.results);
        debug!("Registry lists {} extension versions", versions.len());
        Ok(versions)
    }

    #[instrument(skip(self, dest))]
    async fn download(&self, name: &str, version: &str, dest: &Path) -> Result<()> {
        let url = self.tarball_url(name, version);
        info!("Downloading {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RelateError::NotFound(format!(
                "Unable to find the requested version: {} online",
                version
            )));
        }
        if !status.is_success() {
            return Err(RelateError::Transport(format!("{} returned status {}", url, status)));
        }

        save_response(response, dest, None).await
    }
}
