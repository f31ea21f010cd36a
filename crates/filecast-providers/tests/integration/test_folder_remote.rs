//! RemoteAdapter over a real FolderBackend

use std::sync::Arc;
use std::time::Duration;

use filecast_core::domain::{ItemId, ProviderId, ProviderStatus};
use filecast_core::ports::{CreateKind, IProviderAdapter, SearchLimits};
use filecast_core::ErrorKind;
use filecast_providers::{FolderBackend, RemoteAdapter};
use tempfile::TempDir;

fn setup() -> (TempDir, RemoteAdapter) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("movies")).unwrap();
    std::fs::write(dir.path().join("movies").join("film.mkv"), b"0123456789").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"n").unwrap();

    let adapter = RemoteAdapter::new(
        ProviderId::new("nas").unwrap(),
        Arc::new(FolderBackend::new(dir.path())),
        Duration::from_secs(1),
        SearchLimits::default(),
    )
    .unwrap();
    (dir, adapter)
}

#[tokio::test]
async fn test_browse_folder_backend() {
    let (_dir, adapter) = setup();
    assert_eq!(adapter.root_id().as_str(), "/");

    let mut root = adapter.list(None).await.unwrap();
    root.sort_by(|a, b| a.name().cmp(b.name()));
    assert_eq!(root.len(), 2);
    assert!(root[0].is_directory());
    assert_eq!(root[0].id().as_str(), "/movies");

    let movies = adapter.list(Some(root[0].id())).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert!(movies[0].is_video());
    assert_eq!(movies[0].size(), Some(10));
    assert!(movies[0].modified_at().is_some());
}

#[tokio::test]
async fn test_create_rename_delete_roundtrip() {
    let (dir, adapter) = setup();

    let made = adapter.create(None, "inbox", CreateKind::Directory).await.unwrap();
    assert_eq!(made.id().as_str(), "/inbox");
    let err = adapter.create(None, "inbox", CreateKind::Directory).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let renamed = adapter.rename(made.id(), "archive").await.unwrap();
    assert_eq!(renamed.id().as_str(), "/archive");
    assert!(dir.path().join("archive").is_dir());

    adapter.delete(renamed.id()).await.unwrap();
    assert!(!dir.path().join("archive").exists());
}

#[tokio::test]
async fn test_move_reports_not_supported_and_changes_nothing() {
    let (dir, adapter) = setup();
    let err = adapter
        .move_item(&ItemId::new("/notes.txt").unwrap(), &ItemId::new("/movies").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    assert!(dir.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_walk_search_and_probe() {
    let (dir, adapter) = setup();
    let found = adapter.search("FILM", None, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id().as_str(), "/movies/film.mkv");

    assert_eq!(adapter.probe().await.status, ProviderStatus::Available);
    drop(dir);
    assert_eq!(adapter.probe().await.status, ProviderStatus::Offline);
}
