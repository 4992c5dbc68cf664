use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use super::{DistLocation, DistributionRecord, Edition, get_distribution_info};
use crate::archive::{self, distribution_dir_name};
use crate::constants::PRODUCT_NAME;
use crate::error::{RelateError, Result};
use crate::version::is_resolvable;

/// Remote source of distributions.
#[async_trait]
pub trait DistributionFetcher: Send + Sync {
    /// Everything the remote index offers for the current platform.
    async fn fetch_versions(&self) -> Result<Vec<DistributionRecord>>;

    /// Fetch `version` into `cache_root`, leaving an extracted distribution
    /// directory next to the archive.
    ///
    /// Fails with `NotFound` when the index has no such version. Transport
    /// errors are returned as-is; nothing is retried.
    async fn download(&self, version: &str, cache_root: &Path) -> Result<()>;
}

/// Published index format.
#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    version: String,
    #[serde(default = "default_edition")]
    edition: Edition,
    dist: PlatformMap,
    #[serde(default)]
    sha256: PlatformMap,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformMap {
    linux: Option<String>,
    mac: Option<String>,
    win: Option<String>,
}

impl PlatformMap {
    fn current(&self) -> Option<&String> {
        if cfg!(windows) {
            self.win.as_ref()
        } else if cfg!(target_os = "macos") {
            self.mac.as_ref().or(self.linux.as_ref())
        } else {
            self.linux.as_ref()
        }
    }
}

fn default_edition() -> Edition {
    Edition::Enterprise
}

type DownloadLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Debug, Clone)]
pub struct HttpDistributionFetcher {
    client: reqwest::Client,
    index_url: String,
    locks: DownloadLocks,
}

impl HttpDistributionFetcher {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            index_url: index_url.into(),
            locks: Arc::default(),
        }
    }

    fn lock_for(&self, version: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(version.to_string()).or_default().clone()
    }

    /// Fetch `url` into `dest`, checking `sha256` when given.
    async fn download_to(&self, url: &str, dest: &Path, sha256: Option<&str>) -> Result<()> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RelateError::NotFound(format!("{} returned 404", url)));
        }
        if !status.is_success() {
            return Err(RelateError::Transport(format!("{} returned status {}", url, status)));
        }
        save_response(response, dest, sha256).await
    }
}

/// Stream a response body into `dest`, checking `sha256` when given.
///
/// The body lands in a hidden part file first so a failed transfer never
/// leaves a truncated file under its final name.
pub(crate) async fn save_response(
    response: reqwest::Response,
    dest: &Path,
    sha256: Option<&str>,
) -> Result<()> {
    let url = response.url().to_string();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let part = archive::staging_dir(parent, &format!("{}.part", uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| RelateError::io_at(&part, e))?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        if let Some(expected) = sha256 {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(RelateError::Integrity(format!(
                    "{}: expected sha256 {}, got {}",
                    url, expected, actual
                )));
            }
        }

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| RelateError::io_at(dest, e))
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    result
}

#[async_trait]
impl DistributionFetcher for HttpDistributionFetcher {
    #[instrument(skip(self), fields(index = %self.index_url))]
    async fn fetch_versions(&self) -> Result<Vec<DistributionRecord>> {
        let response = self.client.get(&self.index_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelateError::Transport(format!(
                "{} returned status {}",
                self.index_url, status
            )));
        }

        let index: VersionIndex = response.json().await?;
        let records = records_from_index(index);
        debug!("Found {} online distributions", records.len());
        Ok(records)
    }

    #[instrument(skip_all, fields(version = %version))]
    async fn download(&self, version: &str, cache_root: &Path) -> Result<()> {
        let lock = self.lock_for(version);
        let _guard = lock.lock().await;

        let record = self
            .fetch_versions()
            .await?
            .into_iter()
            .find(|r| r.version == version)
            .ok_or_else(|| {
                RelateError::NotFound(format!(
                    "Unable to find the requested version: {} online",
                    version
                ))
            })?;

        let DistLocation::Url { url, sha256 } = record.location else {
            return Err(RelateError::NotFound(format!("{} has no download URL", version)));
        };

        let archive_name = archive_file_name(&url)?;
        let target_dir = cache_root.join(distribution_dir_name(&archive_name));

        // a concurrent caller may have finished while we waited on the lock
        if get_distribution_info(&target_dir).await?.is_some() {
            debug!("{} already cached at {}", version, target_dir.display());
            return Ok(());
        }

        tokio::fs::create_dir_all(cache_root)
            .await
            .map_err(|e| RelateError::io_at(cache_root, e))?;

        let archive_path = cache_root.join(&archive_name);
        info!("Downloading {} to {}", url, archive_path.display());
        if sha256.is_none() {
            warn!("No checksum published for {}, skipping verification", url);
        }
        self.download_to(&url, &archive_path, sha256.as_deref()).await?;

        let cache_root = cache_root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            unpack_into_cache(&archive_path, &cache_root, &target_dir)
        })
        .await??;

        Ok(())
    }
}

fn records_from_index(index: VersionIndex) -> Vec<DistributionRecord> {
    index
        .versions
        .into_iter()
        .filter(|entry| is_resolvable(&entry.version))
        .filter_map(|entry| {
            let url = entry.dist.current()?.clone();
            Some(DistributionRecord {
                name: format!("{}-{}", PRODUCT_NAME, entry.edition),
                version: entry.version,
                edition: entry.edition,
                location: DistLocation::Url {
                    url,
                    sha256: entry.sha256.current().cloned(),
                },
            })
        })
        .collect()
}

fn archive_file_name(url: &str) -> Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| archive::archive_kind(Path::new(name)).is_some())
        .map(str::to_string)
        .ok_or_else(|| {
            RelateError::InvalidArgument(format!("{} does not point to a supported archive", url))
        })
}

/// Extract next to the archive and move the payload into place in one rename.
fn unpack_into_cache(archive_path: &Path, cache_root: &Path, target_dir: &Path) -> Result<()> {
    let staging = archive::staging_dir(cache_root, &uuid::Uuid::new_v4().to_string());

    let result = (|| {
        archive::extract(archive_path, &staging)?;
        let root = archive::single_root(&staging)?;
        if target_dir.exists() {
            std::fs::remove_dir_all(target_dir).map_err(|e| RelateError::io_at(target_dir, e))?;
        }
        std::fs::rename(&root, target_dir).map_err(|e| RelateError::io_at(target_dir, e))
    })();

    archive::remove_quietly(&staging);
    result
}
