//! DBMS distributions: what is on disk, what is online, and how to get it.

pub mod cache;
pub mod fetcher;
pub mod info;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use cache::{DistributionCache, FsDistributionCache};
pub use fetcher::{DistributionFetcher, HttpDistributionFetcher};
pub use info::{get_distribution_info, DistributionInfo};

/// Provenance of a discovered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    Cached,
    Online,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Cached => write!(f, "cached"),
            Origin::Online => write!(f, "online"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Enterprise,
    Community,
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Enterprise => write!(f, "enterprise"),
            Edition::Community => write!(f, "community"),
        }
    }
}

/// Where a distribution can be materialised from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistLocation {
    /// Extracted distribution directory inside the cache.
    Path(PathBuf),
    /// Downloadable archive, with the published checksum when the index has one.
    Url { url: String, sha256: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRecord {
    pub name: String,
    pub version: String,
    pub edition: Edition,
    pub location: DistLocation,
}

impl DistributionRecord {
    pub fn origin(&self) -> Origin {
        match self.location {
            DistLocation::Path(_) => Origin::Cached,
            DistLocation::Url { .. } => Origin::Online,
        }
    }
}
