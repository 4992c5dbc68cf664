mod common;

use common::*;
use relate_core::distributions::Origin;
use relate_core::extensions::{ExtensionType, discover_extension_distributions};
use relate_core::{ErrorKind, RelateError};
use std::fs;

#[tokio::test]
async fn test_discovery_excludes_corrupt_entry() {
    let temp = create_temp_dir();
    fake_extension(temp.path(), "graph-app", "1.0.0");
    let corrupt = temp.path().join("broken");
    fs::create_dir_all(&corrupt).unwrap();
    fs::write(corrupt.join("relate.manifest.json"), "{\"name\": ").unwrap();

    let found = discover_extension_distributions(temp.path()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "graph-app");
    assert_eq!(found[0].kind, ExtensionType::Static);
}

#[tokio::test]
async fn test_versions_keep_cache_and_online_duplicates() {
    let h = harness(&[], &[("graph-app", "1.0.0"), ("query-log", "0.2.0")]);
    fake_extension(
        &h.env.config().paths().extensions_cache(),
        "graph-app",
        "1.0.0",
    );

    let versions = h.env.fetch_extension_versions().await.unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].origin, Origin::Cached);
    assert_eq!(versions[0].name, "graph-app");
    let graph_app: Vec<_> = versions.iter().filter(|v| v.name == "graph-app").collect();
    assert_eq!(graph_app.len(), 2);
    assert_eq!(graph_app[1].origin, Origin::Online);
}

#[tokio::test]
async fn test_install_from_cache() {
    let h = harness(&[], &[]);
    let cache = h.env.config().paths().extensions_cache();
    fake_extension(&cache, "graph-app", "1.0.0");
    fake_extension(&cache, "graph-app", "1.2.0");

    let meta = h.env.install_extension("graph-app", "^1.0.0").await.unwrap();
    assert_eq!(meta.version, "1.2.0");

    let target = h
        .env
        .config()
        .paths()
        .extensions_data()
        .join("STATIC")
        .join("graph-app");
    assert_eq!(meta.dist, target);
    assert!(target.join("index.html").exists());
}

#[tokio::test]
async fn test_install_downloads_from_registry() {
    let h = harness(&[], &[("query-log", "0.2.0"), ("query-log", "0.3.1")]);

    let meta = h.env.install_extension("query-log", "0.x").await.unwrap();
    assert_eq!(meta.version, "0.3.1");
    assert!(h
        .env
        .config()
        .paths()
        .extensions_cache()
        .join("query-log-0.3.1")
        .join("relate.manifest.json")
        .exists());

    let installed = h.env.list_installed_extensions().await.unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].name, "query-log");
}

#[tokio::test]
async fn test_install_rejects_url_and_unknown_versions() {
    let h = harness(&[], &[("graph-app", "1.0.0")]);

    let err = h
        .env
        .install_extension("graph-app", "https://valid.url.com")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RelateError::NotSupported(ref m) if m == "fetch and install https://valid.url.com"
    ));

    let err = h.env.install_extension("graph-app", "2.0.0").await.unwrap_err();
    assert!(matches!(
        err,
        RelateError::NotFound(ref m) if m == "Unable to find the requested version: 2.0.0 online"
    ));

    let err = h.env.install_extension("graph-app", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let h = harness(&[], &[]);
    let source = fake_extension(h.temp.path(), "graph-app", "1.0.0");
    let spec = source.display().to_string();

    h.env.install_extension("graph-app", &spec).await.unwrap();
    let err = h.env.install_extension("graph-app", &spec).await.unwrap_err();
    assert!(matches!(err, RelateError::InvalidArgument(ref m) if m.contains("already installed")));
}

#[tokio::test]
async fn test_install_from_path_checks_name() {
    let h = harness(&[], &[]);
    let source = fake_extension(h.temp.path(), "graph-app", "1.0.0");

    let err = h
        .env
        .install_extension("other", &source.display().to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(h.env.list_installed_extensions().await.unwrap().is_empty());
}

#[tokio::test]
#[cfg(unix)]
async fn test_link_extension() {
    let h = harness(&[], &[]);
    let source = fake_extension(h.temp.path(), "graph-app", "1.0.0");

    let meta = h.env.link_extension(&source).await.unwrap();
    assert_eq!(meta.name, "graph-app");
    let link = h
        .env
        .config()
        .paths()
        .extensions_data()
        .join("STATIC")
        .join("graph-app");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());

    // edits in the source are visible through the link
    fs::write(source.join("extra.js"), "").unwrap();
    assert!(link.join("extra.js").exists());

    // relinking replaces the link
    h.env.link_extension(&source).await.unwrap();
    assert_eq!(h.env.list_installed_extensions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_link_missing_path() {
    let h = harness(&[], &[]);
    let err = h
        .env
        .link_extension(&h.temp.path().join("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
