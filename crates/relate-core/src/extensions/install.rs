//! Installing extensions into an environment
//!
//! Installed extensions live at `<data>/extensions/<TYPE>/<name>`. Content is
//! copied into a hidden staging directory first and renamed into place, so a
//! failed install never leaves a partial extension behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::discovery::{ExtensionMeta, discover_extension, discover_extension_distributions};
use super::manifest::ExtensionType;
use super::registry::{ExtensionRegistry, ExtensionVersion};
use crate::archive;
use crate::error::{RelateError, Result};
use crate::paths::EnvPaths;
use crate::version::{INVALID_VERSION_MSG, VersionSpec, best_match, classify};

#[derive(Clone)]
pub struct ExtensionManager {
    paths: EnvPaths,
    registry: Arc<dyn ExtensionRegistry>,
}

impl ExtensionManager {
    pub fn new(paths: EnvPaths, registry: Arc<dyn ExtensionRegistry>) -> Self {
        Self { paths, registry }
    }

    /// Cached versions followed by everything the registry offers.
    pub async fn fetch_versions(&self) -> Result<Vec<ExtensionVersion>> {
        let mut versions: Vec<ExtensionVersion> = self
            .cached()
            .await?
            .into_iter()
            .map(|meta| ExtensionVersion {
                name: meta.name,
                version: meta.version,
                origin: meta.origin,
            })
            .collect();
        versions.extend(self.registry.search().await?);
        Ok(versions)
    }

    /// Install `name` at `version`, which may be a semver range or a path to
    /// an extension directory.
    #[instrument(skip(self))]
    pub async fn install(&self, name: &str, version: &str) -> Result<ExtensionMeta> {
        if name.trim().is_empty() {
            return Err(RelateError::InvalidArgument(
                "Extension name must be specified".to_string(),
            ));
        }

        let source = match classify(version)? {
            VersionSpec::Url(_) => {
                return Err(RelateError::NotSupported(format!(
                    "fetch and install {}",
                    version.trim()
                )))
            }
            VersionSpec::FilesystemPath(path) => {
                if !path.is_dir() {
                    return Err(RelateError::InvalidArgument(INVALID_VERSION_MSG.to_string()));
                }
                let meta = discover_extension(&path).await?;
                if meta.name != name {
                    return Err(RelateError::InvalidArgument(format!(
                        "{} contains extension {}, not {}",
                        path.display(),
                        meta.name,
                        name
                    )));
                }
                meta
            }
            VersionSpec::SemverRange(req) => {
                let cached: Vec<ExtensionMeta> = self
                    .cached()
                    .await?
                    .into_iter()
                    .filter(|meta| meta.name == name)
                    .collect();

                match best_match(&req, &cached, |m| m.version.as_str()) {
                    Some(meta) => {
                        debug!("Using cached {}@{}", meta.name, meta.version);
                        meta.clone()
                    }
                    None => {
                        let online: Vec<ExtensionVersion> = self
                            .registry
                            .search()
                            .await?
                            .into_iter()
                            .filter(|v| v.name == name)
                            .collect();
                        let target = best_match(&req, &online, |v| v.version.as_str())
                            .ok_or_else(|| {
                                RelateError::NotFound(format!(
                                    "Unable to find the requested version: {} online",
                                    version.trim()
                                ))
                            })?;
                        let dir = self.download_to_cache(name, &target.version).await?;
                        discover_extension(&dir).await?
                    }
                }
            }
        };

        self.install_from(&source).await
    }

    /// Link a local extension directory into the environment instead of
    /// copying it; edits in the source show up immediately.
    #[instrument(skip(self))]
    pub async fn link(&self, path: &Path) -> Result<ExtensionMeta> {
        let source = tokio::fs::canonicalize(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelateError::NotFound(format!("Extension {} not found", path.display()))
            } else {
                RelateError::io_at(path, e)
            }
        })?;
        let meta = discover_extension(&source).await?;

        let target = self.install_target(meta.kind, &meta.name).await?;
        match tokio::fs::symlink_metadata(&target).await {
            Ok(existing) if existing.file_type().is_symlink() => {
                debug!("Replacing existing link {}", target.display());
                tokio::fs::remove_file(&target)
                    .await
                    .map_err(|e| RelateError::io_at(&target, e))?;
            }
            Ok(_) => return Err(already_installed(&meta.name)),
            Err(_) => {}
        }

        archive::symlink(&source, &target)?;
        info!("Linked {} to {}", meta.name, source.display());
        discover_extension(&target).await
    }

    /// Everything installed, across all types.
    pub async fn list_installed(&self) -> Result<Vec<ExtensionMeta>> {
        let mut installed = Vec::new();
        for kind in ExtensionType::all() {
            let root = self.paths.extensions_data().join(kind.as_str());
            installed.extend(discover_extension_distributions(&root).await?);
        }
        Ok(installed)
    }

    async fn cached(&self) -> Result<Vec<ExtensionMeta>> {
        discover_extension_distributions(&self.paths.extensions_cache()).await
    }

    async fn install_target(&self, kind: ExtensionType, name: &str) -> Result<PathBuf> {
        let type_dir = self.paths.extensions_data().join(kind.as_str());
        tokio::fs::create_dir_all(&type_dir)
            .await
            .map_err(|e| RelateError::io_at(&type_dir, e))?;
        Ok(type_dir.join(name))
    }

    async fn install_from(&self, meta: &ExtensionMeta) -> Result<ExtensionMeta> {
        let target = self.install_target(meta.kind, &meta.name).await?;
        if tokio::fs::symlink_metadata(&target).await.is_ok() {
            return Err(already_installed(&meta.name));
        }

        let source = meta.dist.clone();
        let dest = target.clone();
        tokio::task::spawn_blocking(move || publish_copy(&source, &dest)).await??;

        info!("Installed {}@{} at {}", meta.name, meta.version, target.display());
        discover_extension(&target).await
    }

    /// Fetch a registry tarball into the cache and return the extracted
    /// package directory.
    async fn download_to_cache(&self, name: &str, version: &str) -> Result<PathBuf> {
        let cache = self.paths.extensions_cache();
        tokio::fs::create_dir_all(&cache)
            .await
            .map_err(|e| RelateError::io_at(&cache, e))?;

        let tarball = cache.join(format!("{}-{}.tgz", name, version));
        let target = cache.join(format!("{}-{}", name, version));
        self.registry.download(name, version, &tarball).await?;

        let dest = target.clone();
        tokio::task::spawn_blocking(move || unpack_package(&tarball, &cache, &dest)).await??;
        Ok(target)
    }
}

fn already_installed(name: &str) -> RelateError {
    RelateError::InvalidArgument(format!("Extension {} is already installed", name))
}

fn publish_copy(source: &Path, target: &Path) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let staging = archive::staging_dir(parent, &uuid::Uuid::new_v4().to_string());

    let result = archive::copy_dir(source, &staging).and_then(|()| {
        std::fs::rename(&staging, target).map_err(|e| RelateError::io_at(target, e))
    });
    archive::remove_quietly(&staging);
    result
}

// npm tarballs wrap their content in a single `package/` directory
fn unpack_package(tarball: &Path, cache: &Path, target: &Path) -> Result<()> {
    let staging = archive::staging_dir(cache, &uuid::Uuid::new_v4().to_string());

    let result = (|| {
        archive::extract(tarball, &staging)?;
        let root = archive::single_root(&staging)?;
        if target.exists() {
            std::fs::remove_dir_all(target).map_err(|e| RelateError::io_at(target, e))?;
        }
        std::fs::rename(&root, target).map_err(|e| RelateError::io_at(target, e))
    })();

    archive::remove_quietly(&staging);
    result
}
