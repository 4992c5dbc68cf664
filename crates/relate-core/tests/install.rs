mod common;

use common::*;
use relate_core::installer::read_manifest;
use relate_core::version::{INVALID_VERSION_MSG, VERSION_REQUIRED_MSG};
use relate_core::{ErrorKind, RelateError};
use std::fs;

#[tokio::test]
async fn test_empty_version_is_rejected() {
    let h = harness(&[], &[]);
    for spec in ["", "   ", "\t"] {
        let err = h.env.install_dbms("db", "pw", spec).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{:?}", spec);
        assert_eq!(err.message(), VERSION_REQUIRED_MSG);
    }
}

#[tokio::test]
async fn test_invalid_spec_is_rejected() {
    let h = harness(&[], &[]);
    let missing = h.temp.path().join("nowhere").join("neo4j.tar.gz");
    for spec in ["not a version".to_string(), missing.display().to_string()] {
        let err = h.env.install_dbms("db", "pw", &spec).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), INVALID_VERSION_MSG);
    }
}

#[tokio::test]
async fn test_path_without_distribution_is_rejected() {
    let h = harness(&[], &[]);
    let plain_dir = h.temp.path().join("just-a-dir");
    fs::create_dir_all(&plain_dir).unwrap();
    let plain_file = h.temp.path().join("notes.txt");
    fs::write(&plain_file, "hello").unwrap();

    for path in [plain_dir, plain_file] {
        let err = h
            .env
            .install_dbms("db", "pw", &path.display().to_string())
            .await
            .unwrap_err();
        assert_eq!(err.message(), INVALID_VERSION_MSG);
    }
}

#[tokio::test]
async fn test_url_is_not_supported() {
    let h = harness(&["4.0.4"], &[]);
    let err = h
        .env
        .install_dbms("db", "pw", "https://valid.url.com")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RelateError::NotSupported(ref m) if m == "fetch and install https://valid.url.com"
    ));
    assert!(h.fetcher.downloaded().is_empty());
    assert_eq!(h.cache.calls(), 0);
}

#[tokio::test]
async fn test_version_below_supported_range() {
    let h = harness(&["3.1.0"], &[]);
    let err = h.env.install_dbms("db", "pw", "3.1").await.unwrap_err();
    assert!(matches!(err, RelateError::NotSupported(ref m) if m == "version not in range >=4.x"));
    assert_eq!(h.fetcher.fetch_calls(), 0);
}

#[tokio::test]
async fn test_version_missing_everywhere() {
    let h = harness(&["4.0.4"], &[]);
    let err = h.env.install_dbms("db", "pw", "4.9.9").await.unwrap_err();
    assert!(matches!(
        err,
        RelateError::NotFound(ref m) if m == "Unable to find the requested version: 4.9.9 online"
    ));
    assert!(h.fetcher.downloaded().is_empty());
}

#[tokio::test]
async fn test_semver_without_cache_downloads_then_rescans() {
    let h = harness(&["4.0.3", "4.0.4", "4.1.0"], &[]);

    let id = h.env.install_dbms("db", "pw", "4.0").await.unwrap();

    assert_eq!(h.cache.calls(), 2);
    assert_eq!(h.fetcher.downloaded(), vec!["4.0.4"]);

    let manifest = read_manifest(&h.env.dbms_path(&id).unwrap()).await.unwrap();
    assert_eq!(manifest.version, "4.0.4");
    assert!(h
        .env
        .config()
        .paths()
        .dbmss_cache()
        .join("neo4j-enterprise-4.0.4")
        .is_dir());
}

#[tokio::test]
async fn test_semver_cache_hit_stays_offline() {
    let h = harness(&["4.0.4"], &[]);
    fake_dist(
        &h.env.config().paths().dbmss_cache().join("neo4j-community-4.0.4"),
        "4.0.4",
    );

    let id = h.env.install_dbms("db", "pw", "4.0.4").await.unwrap();

    assert_eq!(h.cache.calls(), 1);
    assert_eq!(h.fetcher.fetch_calls(), 0);
    let manifest = read_manifest(&h.env.dbms_path(&id).unwrap()).await.unwrap();
    assert_eq!(manifest.version, "4.0.4");
}

#[tokio::test]
async fn test_archive_installed_twice_gives_two_instances() {
    let h = harness(&[], &[]);
    let archive = fake_dist_archive(&h.temp.path().join("downloads"), "4.0.4");
    let spec = archive.display().to_string();

    let first = h.env.install_dbms("first", "pw", &spec).await.unwrap();
    let second = h.env.install_dbms("second", "pw", &spec).await.unwrap();
    assert_ne!(first, second);

    for id in [&first, &second] {
        let parsed = uuid::Uuid::parse_str(id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);

        let root = h.env.dbms_path(id).unwrap();
        assert_eq!(root.file_name().unwrap().to_string_lossy(), format!("dbms-{}", id));
        assert_eq!(read_manifest(&root).await.unwrap().version, "4.0.4");
    }

    let listed = h.env.list_dbmss().await.unwrap();
    let names: Vec<_> = listed.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_install_from_directory_path() {
    let h = harness(&[], &[]);
    let dist = fake_dist(&h.temp.path().join("neo4j-enterprise-4.1.0"), "4.1.0");

    let id = h
        .env
        .install_dbms("dir", "pw", &dist.display().to_string())
        .await
        .unwrap();
    let manifest = read_manifest(&h.env.dbms_path(&id).unwrap()).await.unwrap();
    assert_eq!(manifest.version, "4.1.0");
    assert_eq!(manifest.name, "dir");
}

#[tokio::test]
#[cfg(unix)]
async fn test_initial_password_applied() {
    let h = harness(&[], &[]);
    let dist = fake_dist(&h.temp.path().join("dist"), "4.0.4");

    let id = h
        .env
        .install_dbms("db", "s3cret", &dist.display().to_string())
        .await
        .unwrap();

    let password_file = h.env.dbms_path(&id).unwrap().join("initial-password");
    let stored = fs::read_to_string(password_file).unwrap();
    assert_eq!(stored, "s3cret");
}

#[tokio::test]
#[cfg(unix)]
async fn test_failed_credentials_leave_no_instance() {
    let h = harness(&[], &[]);
    let dist = fake_dist(&h.temp.path().join("dist"), "4.0.4");
    fs::write(dist.join("bin").join("neo4j-admin"), "#!/bin/sh\necho boom >&2\nexit 1\n").unwrap();

    let err = h
        .env
        .install_dbms("db", "pw", &dist.display().to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Process);

    assert!(h.env.list_dbmss().await.unwrap().is_empty());
    let leftovers: Vec<_> = fs::read_dir(h.env.config().paths().dbmss_data())
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_unknown_dbms_path() {
    let h = harness(&[], &[]);
    let err = h.env.dbms_path("non-existent").unwrap_err();
    assert!(matches!(err, RelateError::NotFound(ref m) if m == "DBMS \"non-existent\" not found"));
}
