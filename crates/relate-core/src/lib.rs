//! Lifecycle management for local DBMS installations.
//!
//! Resolves version specifiers to distributions, installs instances from
//! them, supervises their processes and manages add-on extensions, all for
//! one [`EnvironmentConfig`] at a time.

pub mod accounts;
pub mod archive;
pub mod batch;
pub mod config;
pub mod constants;
pub mod distributions;
pub mod environment;
pub mod error;
pub mod extensions;
pub mod installer;
pub mod paths;
pub mod supervisor;
pub mod version;

#[cfg(test)]
mod testing;

pub use accounts::{create_account, Account, AuthToken, LocalAccount, RemoteAccount};
pub use batch::BatchResult;
pub use config::{EnvironmentConfig, EnvironmentKind, RegistryConfig};
pub use environment::LocalEnvironment;
pub use error::{ErrorKind, RelateError, Result};
pub use installer::DbmsManifest;
pub use paths::EnvPaths;
pub use supervisor::{DbmsStatus, StatusReport};
pub use version::{classify, VersionSpec};
