//! `relate extension ...`

use anyhow::{Context, Result};
use std::path::Path;

use super::Session;

pub async fn versions(session: &Session, json: bool) -> Result<()> {
    let env = session.local("extension versions")?;
    let versions = env
        .fetch_extension_versions()
        .await
        .context("Failed to fetch extension versions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    if versions.is_empty() {
        println!("No extension versions found.");
        return Ok(());
    }

    println!("Extension versions:");
    for v in versions {
        println!("  {}@{}  ({})", v.name, v.version, v.origin);
    }
    Ok(())
}

pub async fn list(session: &Session, json: bool) -> Result<()> {
    let env = session.local("extension list")?;
    let installed = env
        .list_installed_extensions()
        .await
        .context("Failed to list extensions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
        return Ok(());
    }

    if installed.is_empty() {
        println!("No extensions installed.");
        println!("\nTo install one, use:");
        println!("  relate extension install <name> <version>");
        println!("  relate extension link ./path/to/extension");
        return Ok(());
    }

    println!("Extensions:");
    for ext in installed {
        println!("  {}@{}  [{}]  {}", ext.name, ext.version, ext.kind, ext.dist.display());
    }
    Ok(())
}

pub async fn install(session: &Session, name: &str, version: &str) -> Result<()> {
    let env = session.local("extension install")?;
    let meta = env
        .install_extension(name, version)
        .await
        .with_context(|| format!("Failed to install extension '{}'", name))?;

    println!("✓ Installed {}@{} at {}", meta.name, meta.version, meta.dist.display());
    Ok(())
}

pub async fn link(session: &Session, path: &Path) -> Result<()> {
    let env = session.local("extension link")?;
    let meta = env
        .link_extension(path)
        .await
        .with_context(|| format!("Failed to link {}", path.display()))?;

    println!("✓ Linked {}@{} from {}", meta.name, meta.version, path.display());
    Ok(())
}
