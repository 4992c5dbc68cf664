use async_trait::async_trait;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{DistLocation, DistributionRecord, get_distribution_info};
use crate::archive::is_staging;
use crate::constants::PRODUCT_NAME;
use crate::error::{RelateError, Result};
use crate::version::is_resolvable;

/// Finds distributions that are already extracted under a cache root.
#[async_trait]
pub trait DistributionCache: Send + Sync {
    /// Scan `root` for distribution directories.
    ///
    /// Entries that cannot be read are left out; only semver-valid or
    /// wildcard versions are returned.
    async fn discover(&self, root: &Path) -> Result<Vec<DistributionRecord>>;
}

#[derive(Debug, Default, Clone)]
pub struct FsDistributionCache;

#[async_trait]
impl DistributionCache for FsDistributionCache {
    async fn discover(&self, root: &Path) -> Result<Vec<DistributionRecord>> {
        let dirs = list_dirs(root).await?;

        let lookups = dirs.into_iter().map(|dir| async move {
            match get_distribution_info(&dir).await {
                Ok(Some(info)) => Some(DistributionRecord {
                    name: format!("{}-{}", PRODUCT_NAME, info.edition),
                    version: info.version,
                    edition: info.edition,
                    location: DistLocation::Path(dir),
                }),
                Ok(None) => None,
                Err(e) => {
                    debug!("Skipping {}: {}", dir.display(), e);
                    None
                }
            }
        });

        let records = join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .filter(|record| is_resolvable(&record.version))
            .collect();

        Ok(records)
    }
}

/// Visible sub-directories of `root`; a missing root is an empty cache.
pub(crate) async fn list_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RelateError::io_at(root, e)),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if is_staging(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        // follows symlinks, so linked directories count
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => dirs.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }
    dirs.sort();
    Ok(dirs)
}
