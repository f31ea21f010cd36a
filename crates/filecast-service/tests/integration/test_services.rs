//! Services wiring from a configuration

use std::sync::Arc;

use filecast_core::config::ConfigBuilder;
use filecast_core::domain::{ProviderKind, ProviderStatus};
use filecast_core::ports::MemoryStateStore;
use filecast_service::{ServiceError, Services};

use crate::common::{names, provider};

#[tokio::test]
async fn test_services_from_config_register_every_provider() {
    let home = tempfile::tempdir().unwrap();
    let nas = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("note.txt"), b"hi").unwrap();
    std::fs::create_dir(nas.path().join("Movies")).unwrap();

    let config = ConfigBuilder::new()
        .local_root(home.path().to_path_buf())
        .remote("nas", "Living Room NAS", nas.path().to_path_buf())
        .cache_dir(work.path().join("cache"))
        .state_db_path(work.path().join("state.db"))
        .recent_capacity(5)
        .build();

    let services = Services::from_config(&config).await.unwrap();

    let descriptors = services.router.list_providers().await;
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].kind, ProviderKind::Local);
    assert_eq!(descriptors[1].display_name, "Living Room NAS");
    assert_eq!(descriptors[1].status, ProviderStatus::Available);

    let remote = services.router.contents(None, &provider("nas")).await.unwrap();
    assert_eq!(names(&remote), vec!["Movies"]);
    assert_eq!(services.recent.capacity(), 5);
    assert!(work.path().join("state.db").exists());

    let mut navigation = services.navigation();
    navigation
        .open_provider(&services.router, provider("nas"))
        .await
        .unwrap();
    assert!(navigation.is_watching());
    assert_eq!(services.monitor.subscriber_count(&provider("nas"), None), 1);
}

#[tokio::test]
async fn test_recent_items_persist_across_service_restarts() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("clip.mp4"), b"frames").unwrap();
    let config = ConfigBuilder::new()
        .local_root(home.path().to_path_buf())
        .cache_dir(work.path().join("cache"))
        .state_db_path(work.path().join("state.db"))
        .build();

    {
        let services = Services::from_config(&config).await.unwrap();
        let listing = services
            .router
            .contents(None, &filecast_core::domain::ProviderId::local())
            .await
            .unwrap();
        services.recent.record(&listing[0]).await.unwrap();
    }

    let services = Services::from_config(&config).await.unwrap();
    let recent = services.recent.items().await;
    assert_eq!(names(&recent), vec!["clip.mp4"]);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new()
        .local_root(work.path().to_path_buf())
        .cache_dir(work.path().join("cache"))
        .poll_interval_secs(0)
        .remote("local", "Imposter", work.path().to_path_buf())
        .build();

    let store = Arc::new(MemoryStateStore::new());
    let err = Services::with_state_store(&config, store).await.err().unwrap();
    match err {
        ServiceError::InvalidConfig(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"monitor.poll_interval_secs"));
            assert!(fields.contains(&"remotes[0].id"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
