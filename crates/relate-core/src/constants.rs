//! Names and layout constants shared across the crate.

/// Directory under the cache and data roots holding distributions and instances.
pub const DBMS_DIR_NAME: &str = "dbmss";

/// Prefix of an installed instance directory: `dbms-<uuid>`.
pub const DBMS_DIR_PREFIX: &str = "dbms-";

/// Instance metadata written by the installer.
pub const DBMS_MANIFEST: &str = "relate.dbms.json";

/// Lowest supported DBMS version.
pub const SUPPORTED_VERSION_RANGE: &str = ">=4.x";
pub const SUPPORTED_MIN_VERSION: semver::Version = semver::Version::new(4, 0, 0);

pub const PRODUCT_NAME: &str = "neo4j";
pub const KERNEL_JAR_PREFIX: &str = "neo4j-kernel-";
pub const PID_FILE: &str = "run/neo4j.pid";

#[cfg(windows)]
pub const CONTROL_EXECUTABLE: &str = "bin/neo4j.bat";
#[cfg(not(windows))]
pub const CONTROL_EXECUTABLE: &str = "bin/neo4j";

#[cfg(windows)]
pub const ADMIN_EXECUTABLE: &str = "bin/neo4j-admin.bat";
#[cfg(not(windows))]
pub const ADMIN_EXECUTABLE: &str = "bin/neo4j-admin";

pub const EXTENSION_DIR_NAME: &str = "extensions";
pub const EXTENSION_MANIFEST: &str = "relate.manifest.json";
pub const EXTENSION_MANIFEST_KEY: &str = "relate";
pub const EXTENSION_NPM_PREFIX: &str = "@relate-ext/";
pub const PACKAGE_JSON: &str = "package.json";

/// Per-environment signing secret for local access tokens.
pub const SECRET_FILE: &str = "relate.secret";

pub const WILDCARD_VERSION: &str = "*";

/// Prefix for in-flight directories; anything starting with it is ignored by discovery.
pub const STAGING_PREFIX: &str = ".staging-";
