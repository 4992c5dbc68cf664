//! Platform directory resolution
//!
//! Resolved once at process start and passed down through
//! [`EnvironmentConfig`](crate::EnvironmentConfig).
//! Nothing below this module looks at environment variables or platform dirs.

use std::path::{Path, PathBuf};

use crate::constants::{DBMS_DIR_NAME, EXTENSION_DIR_NAME};
use crate::error::{RelateError, Result};

const APP_DIR: &str = "relate";

pub const DATA_HOME_VAR: &str = "RELATE_DATA_HOME";
pub const CACHE_HOME_VAR: &str = "RELATE_CACHE_HOME";
pub const CONFIG_HOME_VAR: &str = "RELATE_CONFIG_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPaths {
    pub data: PathBuf,
    pub cache: PathBuf,
    pub config: PathBuf,
}

impl EnvPaths {
    /// Build paths rooted at a single directory (`<root>/data`, `<root>/cache`, `<root>/config`).
    pub fn under(root: &Path) -> Self {
        Self {
            data: root.join("data"),
            cache: root.join("cache"),
            config: root.join("config"),
        }
    }

    /// Resolve from `RELATE_*_HOME` overrides, falling back to the platform directories.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            data: resolve(DATA_HOME_VAR, dirs::data_dir)?,
            cache: resolve(CACHE_HOME_VAR, dirs::cache_dir)?,
            config: resolve(CONFIG_HOME_VAR, dirs::config_dir)?,
        })
    }

    /// `<data>/dbmss` - installed instances.
    pub fn dbmss_data(&self) -> PathBuf {
        self.data.join(DBMS_DIR_NAME)
    }

    /// `<cache>/dbmss` - downloaded distributions.
    pub fn dbmss_cache(&self) -> PathBuf {
        self.cache.join(DBMS_DIR_NAME)
    }

    /// `<data>/extensions` - installed extensions, one sub-directory per type.
    pub fn extensions_data(&self) -> PathBuf {
        self.data.join(EXTENSION_DIR_NAME)
    }

    /// `<cache>/extensions` - downloaded extension packages.
    pub fn extensions_cache(&self) -> PathBuf {
        self.cache.join(EXTENSION_DIR_NAME)
    }

    pub fn logs(&self) -> PathBuf {
        self.data.join("logs")
    }

    /// Create every directory this crate writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.dbmss_data(),
            self.dbmss_cache(),
            self.extensions_data(),
            self.extensions_cache(),
            self.config.clone(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| RelateError::io_at(&dir, e))?;
        }
        Ok(())
    }
}

fn resolve(var: &str, platform: fn() -> Option<PathBuf>) -> Result<PathBuf> {
    if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(value));
    }
    platform().map(|dir| dir.join(APP_DIR)).ok_or_else(|| {
        RelateError::InvalidArgument(format!(
            "Failed to determine platform directory; set {}",
            var
        ))
    })
}
