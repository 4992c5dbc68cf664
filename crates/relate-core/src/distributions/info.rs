use std::path::{Path, PathBuf};

use super::Edition;
use crate::constants::KERNEL_JAR_PREFIX;
use crate::error::{RelateError, Result};

/// Version and edition read back from an extracted distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionInfo {
    pub root: PathBuf,
    pub version: String,
    pub edition: Edition,
}

/// Inspect `root/lib` for the kernel jar.
///
/// Returns `Ok(None)` when `root` does not look like a distribution at all.
pub async fn get_distribution_info(root: &Path) -> Result<Option<DistributionInfo>> {
    let lib = root.join("lib");
    let mut entries = match tokio::fs::read_dir(&lib).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RelateError::io_at(&lib, e)),
    };

    let mut version = None;
    let mut edition = Edition::Community;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains("enterprise") {
            edition = Edition::Enterprise;
        }
        if let Some(v) = kernel_version(&name) {
            version = Some(v.to_string());
        }
    }

    Ok(version.map(|version| DistributionInfo {
        root: root.to_path_buf(),
        version,
        edition,
    }))
}

/// `neo4j-kernel-4.0.4.jar` → `4.0.4`
fn kernel_version(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(KERNEL_JAR_PREFIX)?
        .strip_suffix(".jar")
        .filter(|v| !v.is_empty())
}
