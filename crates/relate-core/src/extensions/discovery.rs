use futures_util::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::manifest::{ExtensionManifest, ExtensionType, load_manifest, strip_npm_prefix};
use crate::distributions::cache::list_dirs;
use crate::distributions::Origin;
use crate::error::{RelateError, Result};
use crate::version::is_resolvable;

/// A resolved extension on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionMeta {
    #[serde(rename = "type")]
    pub kind: ExtensionType,
    pub name: String,
    pub version: String,
    /// Directory the extension was found in.
    pub dist: PathBuf,
    pub manifest: ExtensionManifest,
    pub origin: Origin,
}

/// Read the extension rooted at `dir`.
pub async fn discover_extension(dir: &Path) -> Result<ExtensionMeta> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Err(RelateError::NotFound(format!(
            "Extension {} not found",
            dir.display()
        )));
    }

    let owned = dir.to_path_buf();
    let manifest = tokio::task::spawn_blocking(move || load_manifest(&owned))
        .await??
        .ok_or_else(|| {
            RelateError::InvalidArgument(format!("{} contains no valid manifest", dir.display()))
        })?;

    Ok(ExtensionMeta {
        kind: manifest.kind,
        name: strip_npm_prefix(&manifest.name),
        version: manifest.version.clone(),
        dist: dir.to_path_buf(),
        manifest,
        origin: Origin::Cached,
    })
}

/// Every readable extension directly under `root`.
///
/// Unreadable or manifest-less entries are skipped, as are versions that are
/// neither semver nor the wildcard.
pub async fn discover_extension_distributions(root: &Path) -> Result<Vec<ExtensionMeta>> {
    let dirs = list_dirs(root).await?;

    let found = join_all(dirs.iter().map(|dir| async move {
        match discover_extension(dir).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                None
            }
        }
    }))
    .await;

    Ok(found
        .into_iter()
        .flatten()
        .filter(|meta| is_resolvable(&meta.version))
        .collect())
}
