//! Instance materialisation
//!
//! An instance directory only ever appears under its final name once it is
//! complete: content is assembled in a hidden staging directory, credentials
//! are applied there, and a single rename publishes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::archive;
use crate::constants::{ADMIN_EXECUTABLE, DBMS_DIR_PREFIX, DBMS_MANIFEST};
use crate::distributions::{Edition, get_distribution_info};
use crate::error::{RelateError, Result};

/// What to build an instance from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// `.tar.gz`/`.tgz`/`.zip` distribution archive.
    Archive(PathBuf),
    /// Already extracted distribution (cache entry or user path).
    Directory(PathBuf),
}

impl InstallSource {
    fn path(&self) -> &Path {
        match self {
            InstallSource::Archive(p) | InstallSource::Directory(p) => p,
        }
    }
}

/// Metadata persisted inside every instance as `relate.dbms.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbmsManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub edition: Edition,
    pub created_at: DateTime<Utc>,
}

pub fn dbms_dir_name(id: &str) -> String {
    format!("{}{}", DBMS_DIR_PREFIX, id)
}

#[derive(Debug, Clone)]
pub struct Installer {
    install_root: PathBuf,
}

impl Installer {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Materialise `source` as a new instance and return its id.
    ///
    /// Every call creates a fresh instance, even for an identical source.
    #[instrument(skip_all, fields(name = %name, source = %source.path().display()))]
    pub async fn install(
        &self,
        name: &str,
        credentials: &str,
        source: InstallSource,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let target = self.install_root.join(dbms_dir_name(&id));
        let staging = archive::staging_dir(&self.install_root, &id);

        tokio::fs::create_dir_all(&self.install_root)
            .await
            .map_err(|e| RelateError::io_at(&self.install_root, e))?;

        let result = self
            .assemble(&id, name, credentials, &source, &staging, &target)
            .await;

        let staging_cleanup = staging.clone();
        let _ =
            tokio::task::spawn_blocking(move || archive::remove_quietly(&staging_cleanup)).await;

        result?;
        info!("Installed DBMS {} at {}", id, target.display());
        Ok(id)
    }

    async fn assemble(
        &self,
        id: &str,
        name: &str,
        credentials: &str,
        source: &InstallSource,
        staging: &Path,
        target: &Path,
    ) -> Result<()> {
        let root = {
            let source = source.clone();
            let staging = staging.to_path_buf();
            tokio::task::spawn_blocking(move || stage(&source, &staging)).await??
        };

        let dist = get_distribution_info(&root).await?.ok_or_else(|| {
            RelateError::InvalidArgument(format!(
                "{} does not contain a DBMS distribution",
                source.path().display()
            ))
        })?;

        let manifest = DbmsManifest {
            id: id.to_string(),
            name: name.to_string(),
            version: dist.version,
            edition: dist.edition,
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        let manifest_path = root.join(DBMS_MANIFEST);
        tokio::fs::write(&manifest_path, json)
            .await
            .map_err(|e| RelateError::io_at(&manifest_path, e))?;

        set_initial_password(&root, credentials).await?;

        tokio::fs::rename(&root, target)
            .await
            .map_err(|e| RelateError::io_at(target, e))
    }
}

/// Extract or copy into `staging` and return the distribution root inside it.
fn stage(source: &InstallSource, staging: &Path) -> Result<PathBuf> {
    match source {
        InstallSource::Archive(archive_path) => {
            archive::extract(archive_path, staging)?;
            archive::single_root(staging)
        }
        InstallSource::Directory(dir) => {
            let dest = staging.join("dist");
            archive::copy_dir(dir, &dest)?;
            Ok(dest)
        }
    }
}

async fn set_initial_password(root: &Path, credentials: &str) -> Result<()> {
    let admin = root.join(ADMIN_EXECUTABLE);
    if !admin.exists() {
        debug!("No admin executable at {}, skipping credentials", admin.display());
        return Ok(());
    }
    if credentials.is_empty() {
        warn!("No initial credentials supplied for {}", root.display());
        return Ok(());
    }

    let output = tokio::process::Command::new(&admin)
        .arg("set-initial-password")
        .arg(credentials)
        .current_dir(root)
        .env("NEO4J_HOME", root)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| RelateError::Process(format!("Failed to run {}: {}", admin.display(), e)))?;

    if !output.status.success() {
        return Err(RelateError::Process(format!(
            "set-initial-password failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Read an instance's manifest.
pub async fn read_manifest(dbms_root: &Path) -> Result<DbmsManifest> {
    let path = dbms_root.join(DBMS_MANIFEST);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| RelateError::io_at(&path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}
