//! Command implementations
//!
//! Every command receives a [`Session`]: the resolved paths, the loaded
//! config file and the environment the command targets.

pub mod dbms;
pub mod environment;
pub mod extension;

use anyhow::{Context, Result};
use relate_core::{
    Account, BatchResult, EnvPaths, EnvironmentConfig, EnvironmentKind, LocalEnvironment,
    create_account,
};
use std::sync::Arc;

use crate::config::RelateConfig;

pub struct Session {
    pub paths: EnvPaths,
    pub config: RelateConfig,
    pub environment: EnvironmentConfig,
}

impl Session {
    /// Local environment for commands that touch this machine's files.
    pub fn local(&self, command: &str) -> Result<LocalEnvironment> {
        if self.environment.kind() != EnvironmentKind::Local {
            anyhow::bail!(
                "'{}' is only available for local environments; '{}' is {}",
                command,
                self.environment.id(),
                self.environment.kind()
            );
        }
        Ok(LocalEnvironment::new(self.environment.clone()))
    }

    pub fn account(&self) -> Result<Arc<dyn Account>> {
        create_account(self.environment.clone()).context("Failed to create account")
    }
}

/// Print one line per id and fail if any item failed.
pub fn print_batch(ids: &[String], results: BatchResult<String>) -> Result<()> {
    let mut failed = 0;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(output) => println!("✓ {}: {}", id, output),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", id, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} operations failed", failed, ids.len());
    }
    Ok(())
}
