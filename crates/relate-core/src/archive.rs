//! Archive extraction and directory copying
//!
//! Everything here is blocking; async callers go through `tokio::task::spawn_blocking`.

use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::STAGING_PREFIX;
use crate::error::{RelateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

const TAR_GZ_SUFFIXES: [&str; 2] = [".tar.gz", ".tgz"];
const ZIP_SUFFIX: &str = ".zip";
const PLATFORM_SUFFIXES: [&str; 3] = ["-unix", "-windows", "-mac"];

/// Detect an archive from its file name.
pub fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if TAR_GZ_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(ZIP_SUFFIX) {
        Some(ArchiveKind::Zip)
    } else {
        None
    }
}

/// `neo4j-enterprise-4.0.4-unix.tar.gz` → `neo4j-enterprise-4.0.4`
pub fn distribution_dir_name(archive_name: &str) -> String {
    let mut stem = archive_name;
    for suffix in TAR_GZ_SUFFIXES.iter().chain(std::iter::once(&ZIP_SUFFIX)) {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            stem = stripped;
            break;
        }
    }
    for suffix in PLATFORM_SUFFIXES {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            stem = stripped;
            break;
        }
    }
    stem.to_string()
}

/// Unpack `archive` into `dest`, creating `dest` if needed.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let kind = archive_kind(archive).ok_or_else(|| {
        RelateError::InvalidArgument(format!("{} is not a supported archive", archive.display()))
    })?;

    fs::create_dir_all(dest).map_err(|e| RelateError::io_at(dest, e))?;
    let file = fs::File::open(archive).map_err(|e| RelateError::io_at(archive, e))?;

    match kind {
        ArchiveKind::TarGz => {
            let mut tar = tar::Archive::new(GzDecoder::new(file));
            tar.unpack(dest).map_err(|e| RelateError::io_at(archive, e))?;
        }
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file)?;
            zip.extract(dest)?;
        }
    }

    tracing::debug!("Extracted {} into {}", archive.display(), dest.display());
    Ok(())
}

/// Recursively copy `src` to `dest`. Symlinks are recreated, not followed.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RelateError::Io(std::io::Error::other(e.to_string())))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| RelateError::io_at(&target, e))?;
        } else if file_type.is_symlink() {
            let link =
                fs::read_link(entry.path()).map_err(|e| RelateError::io_at(entry.path(), e))?;
            symlink(&link, &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| RelateError::io_at(&target, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
pub fn symlink(original: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(original, link).map_err(|e| RelateError::io_at(link, e))
}

#[cfg(windows)]
pub fn symlink(original: &Path, link: &Path) -> Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
    .map_err(|e| RelateError::io_at(link, e))
}

/// If `dir` holds exactly one directory and nothing else visible, return it.
/// Archives usually wrap their payload in one top-level folder.
pub fn single_root(dir: &Path) -> Result<PathBuf> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| RelateError::io_at(dir, e))? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry);
    }

    match entries.as_slice() {
        [only] if only.file_type()?.is_dir() => Ok(only.path()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// A hidden sibling directory used while a directory is being materialised.
pub fn staging_dir(parent: &Path, tag: &str) -> PathBuf {
    parent.join(format!("{}{}", STAGING_PREFIX, tag))
}

pub fn is_staging(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX)
}

/// Best-effort removal; logs instead of failing.
pub fn remove_quietly(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(path) {
        tracing::warn!("Failed to clean up {}: {}", path.display(), e);
    }
}
