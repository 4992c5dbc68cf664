//! Local environment orchestration
//!
//! [`LocalEnvironment`] ties version resolution, the distribution cache and
//! fetcher, the installer and the process supervisor together for one
//! environment configuration. It keeps no registry of its own: which
//! instances exist is read back from the install root on every call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::archive::archive_kind;
use crate::batch::BatchResult;
use crate::config::EnvironmentConfig;
use crate::constants::DBMS_DIR_PREFIX;
use crate::distributions::cache::list_dirs;
use crate::distributions::{
    get_distribution_info, DistLocation, DistributionCache, DistributionFetcher,
    DistributionRecord, FsDistributionCache, HttpDistributionFetcher,
};
use crate::error::{RelateError, Result};
use crate::extensions::{
    ExtensionManager, ExtensionMeta, ExtensionRegistry, ExtensionVersion, HttpExtensionRegistry,
};
use crate::installer::{DbmsManifest, InstallSource, Installer, read_manifest};
use crate::supervisor::{ProcessSupervisor, StatusReport};
use crate::version::{INVALID_VERSION_MSG, VersionSpec, best_match, classify, ensure_supported};

#[derive(Clone)]
pub struct LocalEnvironment {
    config: EnvironmentConfig,
    cache: Arc<dyn DistributionCache>,
    fetcher: Arc<dyn DistributionFetcher>,
    installer: Installer,
    supervisor: ProcessSupervisor,
    extensions: ExtensionManager,
}

impl LocalEnvironment {
    /// Environment backed by the filesystem cache and the configured remote index and registry.
    pub fn new(config: EnvironmentConfig) -> Self {
        let fetcher = HttpDistributionFetcher::new(config.dist_versions_url());
        let registry = HttpExtensionRegistry::new(config.extension_registry().clone());
        Self::with_components(
            config,
            Arc::new(FsDistributionCache),
            Arc::new(fetcher),
            Arc::new(registry),
        )
    }

    /// Environment with explicit collaborators; tests substitute offline fakes here.
    pub fn with_components(
        config: EnvironmentConfig,
        cache: Arc<dyn DistributionCache>,
        fetcher: Arc<dyn DistributionFetcher>,
        registry: Arc<dyn ExtensionRegistry>,
    ) -> Self {
        let paths = config.paths().clone();
        Self {
            installer: Installer::new(paths.dbmss_data()),
            supervisor: ProcessSupervisor::new(paths.dbmss_data()),
            extensions: ExtensionManager::new(paths, registry),
            config,
            cache,
            fetcher,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Resolve `version` and install a new instance from it; returns the instance id.
    #[instrument(skip(self, credentials), fields(env = %self.config.id()))]
    pub async fn install_dbms(
        &self,
        name: &str,
        credentials: &str,
        version: &str,
    ) -> Result<String> {
        let source = match classify(version)? {
            VersionSpec::Url(_) => {
                return Err(RelateError::NotSupported(format!(
                    "fetch and install {}",
                    version.trim()
                )))
            }
            VersionSpec::FilesystemPath(path) => source_from_path(&path).await?,
            VersionSpec::SemverRange(req) => {
                ensure_supported(&req)?;
                self.resolve_semver(&req, version.trim()).await?
            }
        };

        let id = self.installer.install(name, credentials, source).await?;
        info!("DBMS {} ({}) installed", name, id);
        Ok(id)
    }

    /// Cache first, then the online index; a download is followed by a fresh
    /// cache scan so the installed copy is always the cached one.
    async fn resolve_semver(&self, req: &semver::VersionReq, spec: &str) -> Result<InstallSource> {
        let cache_root = self.config.paths().dbmss_cache();
        let not_found = || {
            RelateError::NotFound(format!(
                "Unable to find the requested version: {} online",
                spec
            ))
        };

        let cached = self.cache.discover(&cache_root).await?;
        if let Some(record) = best_match(req, &cached, |r| r.version.as_str()) {
            debug!("Cache hit for {}: {}", spec, record.version);
            return install_source(record);
        }

        let online = self.fetcher.fetch_versions().await?;
        let target = best_match(req, &online, |r| r.version.as_str()).ok_or_else(not_found)?;
        info!("Fetching {} {}", target.name, target.version);
        self.fetcher.download(&target.version, &cache_root).await?;

        let cached = self.cache.discover(&cache_root).await?;
        let record = best_match(req, &cached, |r| r.version.as_str()).ok_or_else(not_found)?;
        install_source(record)
    }

    pub async fn start_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.supervisor.start_all(ids).await
    }

    pub async fn stop_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.supervisor.stop_all(ids).await
    }

    pub async fn status_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.supervisor.status_all(ids).await
    }

    /// Structured status of one instance.
    pub async fn dbms_status(&self, id: &str) -> Result<StatusReport> {
        self.supervisor.status(id).await
    }

    pub fn dbms_path(&self, id: &str) -> Result<PathBuf> {
        self.supervisor.dbms_root(id)
    }

    /// Manifests of every installed instance, ordered by creation time.
    pub async fn list_dbmss(&self) -> Result<Vec<DbmsManifest>> {
        let mut manifests = Vec::new();
        for dir in list_dirs(self.installer.install_root()).await? {
            let is_instance = dir
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(DBMS_DIR_PREFIX));
            if !is_instance {
                continue;
            }
            match read_manifest(&dir).await {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => debug!("Skipping {}: {}", dir.display(), e),
            }
        }
        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    pub async fn fetch_extension_versions(&self) -> Result<Vec<ExtensionVersion>> {
        self.extensions.fetch_versions().await
    }

    pub async fn install_extension(&self, name: &str, version: &str) -> Result<ExtensionMeta> {
        self.extensions.install(name, version).await
    }

    pub async fn link_extension(&self, path: &Path) -> Result<ExtensionMeta> {
        self.extensions.link(path).await
    }

    pub async fn list_installed_extensions(&self) -> Result<Vec<ExtensionMeta>> {
        self.extensions.list_installed().await
    }
}

fn install_source(record: &DistributionRecord) -> Result<InstallSource> {
    match &record.location {
        DistLocation::Path(dir) => Ok(InstallSource::Directory(dir.clone())),
        DistLocation::Url { url, .. } => Err(RelateError::InvalidArgument(format!(
            "{} {} is not available locally: {}",
            record.name, record.version, url
        ))),
    }
}

async fn source_from_path(path: &Path) -> Result<InstallSource> {
    let invalid = || RelateError::InvalidArgument(INVALID_VERSION_MSG.to_string());

    let meta = tokio::fs::metadata(path).await.map_err(|_| invalid())?;
    if meta.is_file() {
        return match archive_kind(path) {
            Some(_) => Ok(InstallSource::Archive(path.to_path_buf())),
            None => Err(invalid()),
        };
    }

    match get_distribution_info(path).await? {
        Some(_) => Ok(InstallSource::Directory(path.to_path_buf())),
        None => Err(invalid()),
    }
}
