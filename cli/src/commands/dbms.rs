//! `relate dbms ...`

use anyhow::{Context, Result};
use relate_core::AuthToken;
use std::path::Path;

use super::{Session, print_batch};

pub async fn install(
    session: &Session,
    name: &str,
    credentials: &str,
    version: &str,
) -> Result<()> {
    let env = session.local("dbms install")?;
    let id = env
        .install_dbms(name, credentials, version)
        .await
        .with_context(|| format!("Failed to install DBMS '{}'", name))?;

    println!("✓ Installed DBMS \"{}\" with id {}", name, id);
    Ok(())
}

pub async fn start(session: &Session, ids: &[String]) -> Result<()> {
    let results = session.account()?.start_dbmss(ids).await;
    print_batch(ids, results)
}

pub async fn stop(session: &Session, ids: &[String]) -> Result<()> {
    let results = session.account()?.stop_dbmss(ids).await;
    print_batch(ids, results)
}

pub async fn status(session: &Session, ids: &[String]) -> Result<()> {
    let results = session.account()?.status_dbmss(ids).await;
    print_batch(ids, results)
}

pub async fn list(session: &Session, json: bool) -> Result<()> {
    let env = session.local("dbms list")?;
    let dbmss = env.list_dbmss().await.context("Failed to list DBMSs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dbmss)?);
        return Ok(());
    }

    if dbmss.is_empty() {
        println!("No DBMSs installed in environment '{}'.", session.environment.id());
        println!("\nTo install one, use:");
        println!("  relate dbms install 4.0 --name my-dbms");
        return Ok(());
    }

    println!("DBMSs:");
    for dbms in dbmss {
        println!(
            "  {}  {}  {} {}  ({})",
            dbms.id,
            dbms.name,
            dbms.version,
            dbms.edition,
            dbms.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Open the instance directory, or with `log` just print it.
pub async fn open(session: &Session, id: &str, log: bool) -> Result<()> {
    let env = session.local("dbms open")?;
    let path = env.dbms_path(id)?;

    if log {
        println!("{}", path.display());
        return Ok(());
    }
    open_in_file_manager(&path).await
}

async fn open_in_file_manager(path: &Path) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };

    tokio::process::Command::new(opener)
        .arg(path)
        .spawn()
        .with_context(|| format!("Failed to run {} for {}", opener, path.display()))?;
    Ok(())
}

pub async fn access_token(
    session: &Session,
    app_id: &str,
    dbms_id: &str,
    principal: &str,
    credentials: &str,
) -> Result<()> {
    let token = session
        .account()?
        .create_access_token(app_id, dbms_id, &AuthToken::basic(principal, credentials))
        .await
        .context("Failed to create access token")?;

    println!("{}", token);
    Ok(())
}
