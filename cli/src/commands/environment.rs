//! `relate environment ...`

use anyhow::{Context, Result};
use relate_core::EnvironmentKind;

use super::Session;
use crate::config::{self, EnvironmentEntry};

pub fn list(session: &Session) -> Result<()> {
    let default = session.config.default_id();
    println!("Environments:");
    for id in session.config.ids() {
        let kind = session
            .config
            .environments
            .get(&id)
            .map(|e| e.kind)
            .unwrap_or(EnvironmentKind::Local);
        let marker = if id == default { "*" } else { " " };
        println!("{} {}  ({})", marker, id, kind);
    }
    Ok(())
}

pub fn info(session: &Session) -> Result<()> {
    let env = &session.environment;
    let paths = env.paths();

    println!("Environment:     {}", env.id());
    println!("Type:            {}", env.kind());
    println!("User:            {}", env.user());
    if let Some(url) = env.remote_url() {
        println!("Remote URL:      {}", url);
    }
    println!("Config file:     {}", config::get_config_path(&session.paths).display());
    println!("Data directory:  {}", paths.data.display());
    println!("Cache directory: {}", paths.cache.display());
    println!("DBMS installs:   {}", paths.dbmss_data().display());
    println!("Extensions:      {}", paths.extensions_data().display());
    println!("Versions index:  {}", env.dist_versions_url());
    Ok(())
}

pub fn add(session: &Session, id: &str, remote_url: Option<String>) -> Result<()> {
    let entry = EnvironmentEntry {
        kind: if remote_url.is_some() {
            EnvironmentKind::Remote
        } else {
            EnvironmentKind::Local
        },
        remote_url,
        ..EnvironmentEntry::local()
    };

    config::add_environment(&session.paths, id, entry)
        .with_context(|| format!("Failed to add environment '{}'", id))?;
    println!("✓ Added environment: {}", id);
    Ok(())
}

pub fn use_environment(session: &Session, id: &str) -> Result<()> {
    config::set_default_environment(&session.paths, id)
        .with_context(|| format!("Failed to switch to environment '{}'", id))?;
    println!("✓ Default environment: {}", id);
    Ok(())
}
