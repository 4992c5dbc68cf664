//! Extension manifest loading
//!
//! A manifest can come from three places, tried in this order:
//!
//! 1. a dedicated `relate.manifest.json`
//! 2. the `relate` key embedded in `package.json`
//! 3. inferred from the plain `package.json` name, version and main
//!
//! Each source is an attempt returning `Ok(None)` when it does not apply; the
//! first `Some` wins. A source that applies but is malformed is an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{
    EXTENSION_MANIFEST, EXTENSION_MANIFEST_KEY, EXTENSION_NPM_PREFIX, PACKAGE_JSON,
};
use crate::error::{RelateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtensionType {
    Static,
    Node,
}

impl ExtensionType {
    /// Directory name under the installed-extensions root.
    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionType::Static => "STATIC",
            ExtensionType::Node => "NODE",
        }
    }

    pub fn all() -> [ExtensionType; 2] {
        [ExtensionType::Static, ExtensionType::Node]
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type")]
    pub kind: ExtensionType,
    #[serde(default = "default_main")]
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_main() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: String,
    #[serde(default)]
    version: String,
    main: Option<String>,
    description: Option<String>,
}

type Attempt = fn(&Path) -> Result<Option<ExtensionManifest>>;

const ATTEMPTS: [Attempt; 3] = [from_manifest_file, from_embedded_key, from_package_name];

/// Load the manifest of the extension rooted at `dir`, if any source applies.
pub fn load_manifest(dir: &Path) -> Result<Option<ExtensionManifest>> {
    for attempt in ATTEMPTS {
        if let Some(mut manifest) = attempt(dir)? {
            manifest.root = dir.to_path_buf();
            return Ok(Some(manifest));
        }
    }
    Ok(None)
}

/// Drop the registry scope from a package name.
pub fn strip_npm_prefix(name: &str) -> String {
    name.replacen(EXTENSION_NPM_PREFIX, "", 1)
}

fn read_json(path: &Path) -> Result<Option<serde_json::Value>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RelateError::io_at(path, e)),
    }
}

fn from_manifest_file(dir: &Path) -> Result<Option<ExtensionManifest>> {
    read_json(&dir.join(EXTENSION_MANIFEST))?
        .map(|value| serde_json::from_value(value).map_err(RelateError::from))
        .transpose()
}

fn from_embedded_key(dir: &Path) -> Result<Option<ExtensionManifest>> {
    let Some(mut package) = read_json(&dir.join(PACKAGE_JSON))? else {
        return Ok(None);
    };
    match package.get_mut(EXTENSION_MANIFEST_KEY) {
        Some(embedded) => Ok(Some(serde_json::from_value(embedded.take())?)),
        None => Ok(None),
    }
}

fn from_package_name(dir: &Path) -> Result<Option<ExtensionManifest>> {
    let Some(value) = read_json(&dir.join(PACKAGE_JSON))? else {
        return Ok(None);
    };
    let package: PackageJson = serde_json::from_value(value)?;

    // "@scope/name" → "name"
    let name = package
        .name
        .split('/')
        .nth(1)
        .unwrap_or(&package.name)
        .to_string();

    Ok(Some(ExtensionManifest {
        name,
        version: package.version,
        kind: ExtensionType::Static,
        main: package.main.unwrap_or_else(default_main),
        description: package.description,
        root: PathBuf::new(),
    }))
}
