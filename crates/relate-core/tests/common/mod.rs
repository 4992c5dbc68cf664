//! Shared fixtures for relate-core integration tests
//!
//! Distributions are fabricated on the fly: a `lib/neo4j-kernel-<v>.jar`
//! marker plus shell-script stand-ins for the control and admin executables.
//! Nothing here touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use relate_core::distributions::{
    DistLocation, DistributionCache, DistributionFetcher, DistributionRecord, Edition,
    FsDistributionCache,
};
use relate_core::extensions::{ExtensionRegistry, ExtensionVersion};
use relate_core::{EnvPaths, EnvironmentConfig, LocalEnvironment, RelateError, Result};

pub const CONTROL_SCRIPT: &str = r#"#!/bin/sh
DBMS_HOME="$(cd "$(dirname "$0")/.." && pwd)"
PID_FILE="$DBMS_HOME/run/neo4j.pid"

running() {
    [ -f "$PID_FILE" ] && kill -0 "$(cat "$PID_FILE")" 2>/dev/null
}

case "$1" in
    start)
        if running; then
            echo "Neo4j is already running (pid $(cat "$PID_FILE"))."
            exit 0
        fi
        mkdir -p "$DBMS_HOME/run"
        sleep 300 >/dev/null 2>&1 &
        echo $! > "$PID_FILE"
        echo "Started neo4j (pid $!)."
        ;;
    stop)
        if running; then
            kill "$(cat "$PID_FILE")"
        fi
        rm -f "$PID_FILE"
        echo "Stopped neo4j."
        ;;
    status)
        if running; then
            echo "Neo4j is running at pid $(cat "$PID_FILE")"
            exit 0
        fi
        echo "Neo4j is not running"
        exit 3
        ;;
    *)
        echo "Usage: neo4j { start | stop | status }"
        exit 1
        ;;
esac
"#;

pub const ADMIN_SCRIPT: &str = r#"#!/bin/sh
DBMS_HOME="$(cd "$(dirname "$0")/.." && pwd)"
if [ "$1" = "set-initial-password" ]; then
    printf '%s' "$2" > "$DBMS_HOME/initial-password"
    exit 0
fi
exit 1
"#;

pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Config whose data/cache/config roots all live under `root`.
pub fn test_config(root: &Path) -> EnvironmentConfig {
    EnvironmentConfig::builder("test", EnvPaths::under(root))
        .user("tester")
        .dist_versions_url("http://127.0.0.1:9/versions.json")
        .build()
        .expect("valid config")
}

/// Write an extracted distribution of `version` at `dir`.
pub fn fake_dist(dir: &Path, version: &str) -> PathBuf {
    let lib = dir.join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join(format!("neo4j-kernel-{}.jar", version)), "").unwrap();
    fs::write(dir.join("LICENSE.txt"), "fixture").unwrap();
    write_script(&dir.join("bin").join("neo4j"), CONTROL_SCRIPT);
    write_script(&dir.join("bin").join("neo4j-admin"), ADMIN_SCRIPT);
    dir.to_path_buf()
}

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// `<dir>/neo4j-community-<version>-unix.tar.gz` wrapping one top-level folder.
pub fn fake_dist_archive(dir: &Path, version: &str) -> PathBuf {
    let scratch = create_temp_dir();
    let top = format!("neo4j-community-{}", version);
    let src = fake_dist(&scratch.path().join(&top), version);

    fs::create_dir_all(dir).unwrap();
    let archive = dir.join(format!("{}-unix.tar.gz", top));
    write_tar_gz(&archive, &top, &src);
    archive
}

pub fn write_tar_gz(archive: &Path, top: &str, src: &Path) {
    let file = fs::File::create(archive).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.append_dir_all(top, src).unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

pub fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Filesystem cache that counts scans.
#[derive(Default)]
pub struct CountingCache {
    pub discovers: AtomicUsize,
}

impl CountingCache {
    pub fn calls(&self) -> usize {
        self.discovers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistributionCache for CountingCache {
    async fn discover(&self, root: &Path) -> Result<Vec<DistributionRecord>> {
        self.discovers.fetch_add(1, Ordering::SeqCst);
        FsDistributionCache.discover(root).await
    }
}

/// Offline fetcher serving a fixed list of versions; a download writes an
/// extracted distribution into the cache root.
#[derive(Default)]
pub struct FakeFetcher {
    pub versions: Vec<String>,
    pub fetches: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn offering(versions: &[&str]) -> Self {
        Self {
            versions: strings(versions),
            ..Self::default()
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DistributionFetcher for FakeFetcher {
    async fn fetch_versions(&self) -> Result<Vec<DistributionRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .versions
            .iter()
            .map(|v| DistributionRecord {
                name: "neo4j-enterprise".to_string(),
                version: v.clone(),
                edition: Edition::Enterprise,
                location: DistLocation::Url {
                    url: format!("https://dist.example.com/neo4j-enterprise-{}-unix.tar.gz", v),
                    sha256: None,
                },
            })
            .collect())
    }

    async fn download(&self, version: &str, cache_root: &Path) -> Result<()> {
        if !self.versions.iter().any(|v| v == version) {
            return Err(RelateError::NotFound(format!(
                "Unable to find the requested version: {} online",
                version
            )));
        }
        self.downloads.lock().unwrap().push(version.to_string());
        fake_dist(&cache_root.join(format!("neo4j-enterprise-{}", version)), version);
        Ok(())
    }
}

/// Offline registry; downloads produce npm-style tarballs with a `package/` root.
#[derive(Default)]
pub struct FakeRegistry {
    pub published: Vec<ExtensionVersion>,
}

impl FakeRegistry {
    pub fn publishing(items: &[(&str, &str)]) -> Self {
        Self {
            published: items
                .iter()
                .map(|(name, version)| ExtensionVersion {
                    name: name.to_string(),
                    version: version.to_string(),
                    origin: relate_core::distributions::Origin::Online,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ExtensionRegistry for FakeRegistry {
    async fn search(&self) -> Result<Vec<ExtensionVersion>> {
        Ok(self.published.clone())
    }

    async fn download(&self, name: &str, version: &str, dest: &Path) -> Result<()> {
        if !self.published.iter().any(|p| p.name == name && p.version == version) {
            return Err(RelateError::NotFound(format!(
                "Unable to find the requested version: {} online",
                version
            )));
        }
        let scratch = create_temp_dir();
        let package = fake_extension(scratch.path(), name, version);
        write_tar_gz(dest, "package", &package);
        Ok(())
    }
}

/// Extension directory with a dedicated manifest.
pub fn fake_extension(parent: &Path, name: &str, version: &str) -> PathBuf {
    let dir = parent.join(format!("{}-{}", name, version));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("relate.manifest.json"),
        format!(
            r#"{{"name":"@relate-ext/{}","version":"{}","type":"STATIC","main":"index.html"}}"#,
            name, version
        ),
    )
    .unwrap();
    fs::write(dir.join("index.html"), "<html></html>").unwrap();
    dir
}

pub struct Harness {
    pub temp: TempDir,
    pub cache: Arc<CountingCache>,
    pub fetcher: Arc<FakeFetcher>,
    pub env: LocalEnvironment,
}

pub fn harness(online: &[&str], extensions: &[(&str, &str)]) -> Harness {
    let temp = create_temp_dir();
    let cache = Arc::new(CountingCache::default());
    let fetcher = Arc::new(FakeFetcher::offering(online));
    let env = LocalEnvironment::with_components(
        test_config(temp.path()),
        cache.clone(),
        fetcher.clone(),
        Arc::new(FakeRegistry::publishing(extensions)),
    );
    Harness {
        temp,
        cache,
        fetcher,
        env,
    }
}
