//! Common test utilities and fixtures
//!
//! Every command runs with HOME and the RELATE_*_HOME directories pointing
//! into a fresh temp directory, so nothing leaks into the real user dirs.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `relate` with the sandbox environment applied.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("relate").unwrap();
        cmd.env("HOME", self.path())
            .env("RELATE_DATA_HOME", self.path().join("data"))
            .env("RELATE_CACHE_HOME", self.path().join("cache"))
            .env("RELATE_CONFIG_HOME", self.path().join("config"))
            .env_remove("RUST_LOG");
        cmd
    }

    /// Extracted distribution with only the kernel jar marker.
    pub fn fake_dist(&self, version: &str) -> PathBuf {
        let dir = self.path().join(format!("neo4j-community-{}", version));
        let lib = dir.join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join(format!("neo4j-kernel-{}.jar", version)), "").unwrap();
        dir
    }

    pub fn fake_extension(&self, name: &str, version: &str) -> PathBuf {
        let dir = self.path().join("src-extensions").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"@relate-ext/{}","version":"{}"}}"#, name, version),
        )
        .unwrap();
        dir
    }
}

/// Install a distribution and return the new id from the command output.
pub fn install(sandbox: &Sandbox, name: &str, source: &Path) -> String {
    let output = sandbox
        .cmd()
        .args(["dbms", "install", &source.display().to_string(), "--name", name])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .last()
        .expect("install prints the id")
        .to_string()
}
