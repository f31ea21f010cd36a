//! ProviderRouter routing, probing and cache-backed resolution

use std::sync::Arc;
use std::time::Duration;

use filecast_core::domain::{ContentType, FileItem, ProviderId, ProviderKind, ProviderStatus};
use filecast_core::ports::{CreateKind, IProviderAdapter, MemoryStateStore, SearchLimits};
use filecast_core::ErrorKind;
use filecast_providers::LocalAdapter;
use filecast_service::{MutationOp, ProviderRouter, RecentItems};

use crate::common::{fixture, fixture_with_cache, names, provider, FakeAdapter, Fixture, Probe};

async fn with_remote(fx: &Fixture, remote: &Arc<FakeAdapter>) {
    let adapter: Arc<dyn IProviderAdapter> = remote.clone();
    fx.router
        .register_remote(remote.provider_id().clone(), "Cloud", adapter)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_local_directory_listing_is_directories_first() {
    let root = tempfile::tempdir().unwrap();
    let docs = root.path().join("docs");
    std::fs::create_dir_all(docs.join("sub")).unwrap();
    std::fs::write(docs.join("a.txt"), b"0123456789").unwrap();

    let local = LocalAdapter::new(root.path(), false, SearchLimits::default()).unwrap();
    let fx = fixture(Arc::new(local));
    let local_id = ProviderId::local();

    let top = fx.router.contents(None, &local_id).await.unwrap();
    assert_eq!(names(&top), vec!["docs"]);

    let listing = fx.router.contents(Some(top[0].id()), &local_id).await.unwrap();
    assert_eq!(names(&listing), vec!["sub", "a.txt"]);
    assert!(listing[0].is_directory());
    assert_eq!(listing[1].size(), Some(10));
}

#[tokio::test(start_paused = true)]
async fn test_list_providers_reports_probe_outcomes() {
    let fx = fixture(Arc::new(FakeAdapter::local()));
    let up = Arc::new(FakeAdapter::remote("nas"));
    let down = Arc::new(FakeAdapter::remote("cloud").with_probe(Probe::Down));
    let hung = Arc::new(FakeAdapter::remote("slow").with_probe(Probe::Hang));
    for remote in [&up, &down, &hung] {
        with_remote(&fx, remote).await;
    }

    let descriptors = fx.router.list_providers().await;

    let ids: Vec<&str> = descriptors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["local", "nas", "cloud", "slow"]);
    assert_eq!(descriptors[0].kind, ProviderKind::Local);
    assert_eq!(descriptors[0].status, ProviderStatus::Available);

    assert_eq!(descriptors[1].status, ProviderStatus::Available);
    assert!(descriptors[1].last_sync_time.is_some());
    assert!(descriptors[1].last_error.is_none());

    assert_eq!(descriptors[2].status, ProviderStatus::Offline);
    assert_eq!(descriptors[2].last_error.as_deref(), Some("host unreachable"));

    assert_eq!(descriptors[3].status, ProviderStatus::Offline);
    assert!(descriptors[3].last_error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_remote_status_is_unknown_until_probed() {
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &Arc::new(FakeAdapter::remote("nas"))).await;

    let descriptors = fx.router.descriptors().await;
    assert_eq!(descriptors[1].status, ProviderStatus::Unknown);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let fx = fixture(Arc::new(FakeAdapter::local()));
    let nas = Arc::new(FakeAdapter::remote("nas"));
    with_remote(&fx, &nas).await;

    let adapter: Arc<dyn IProviderAdapter> = nas.clone();
    let err = fx
        .router
        .register_remote(provider("nas"), "Again", adapter)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_unknown_provider() {
    let fx = fixture(Arc::new(FakeAdapter::local()));
    let err = fx.router.contents(None, &provider("ghost")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderNotFound);
}

#[tokio::test]
async fn test_errors_keep_their_kind_and_gain_context() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    cloud.fail_listing(ErrorKind::AuthenticationRequired);
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;

    let err = fx.router.contents(None, &provider("cloud")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationRequired);
    assert_eq!(err.provider(), Some(&provider("cloud")));
    assert_eq!(err.operation(), Some("contents"));
}

#[tokio::test]
async fn test_cross_provider_move_and_copy_touch_no_adapter() {
    let local = Arc::new(FakeAdapter::local());
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(local.clone());
    with_remote(&fx, &cloud).await;

    let item = local.file("song.mp3");
    let destination = cloud.dir("Music");

    let err = fx.router.move_item(&item, &destination).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    let err = fx.router.copy(&item, &destination).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);

    assert_eq!(FakeAdapter::calls(&local.mutation_calls), 0);
    assert_eq!(FakeAdapter::calls(&cloud.mutation_calls), 0);
}

#[tokio::test]
async fn test_mutations_route_to_the_owning_provider() {
    let local = Arc::new(FakeAdapter::local());
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(local.clone());
    with_remote(&fx, &cloud).await;

    let created = fx
        .router
        .mutate(MutationOp::Create {
            provider: provider("cloud"),
            parent: None,
            name: "Shows".into(),
            kind: CreateKind::Directory,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(created.is_directory());
    assert_eq!(created.provider_id(), &provider("cloud"));

    let deleted = fx
        .router
        .mutate(MutationOp::Delete {
            item: cloud.file("old.mp4"),
        })
        .await
        .unwrap();
    assert!(deleted.is_none());

    let renamed = fx
        .router
        .mutate(MutationOp::Rename {
            item: local.file("a.txt"),
            new_name: "b.txt".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name(), "b.txt");

    assert_eq!(FakeAdapter::calls(&cloud.mutation_calls), 2);
    assert_eq!(FakeAdapter::calls(&local.mutation_calls), 1);
}

#[tokio::test]
async fn test_unsupported_same_provider_move_is_reported() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;

    let err = fx
        .router
        .move_item(&cloud.file("a.mp4"), &cloud.dir("Shows"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    assert_eq!(err.provider(), Some(&provider("cloud")));
}

#[tokio::test]
async fn test_empty_search_never_reaches_the_adapter() {
    let local = Arc::new(FakeAdapter::local());
    let fx = fixture(local.clone());

    let results = fx.router.search("   ", &ProviderId::local(), None).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(FakeAdapter::calls(&local.search_calls), 0);
}

#[tokio::test]
async fn test_search_filter_is_enforced_by_the_router() {
    let local = FakeAdapter::local();
    let results = vec![
        local.file("movie.mp4"),
        local.file("movie.mp3"),
        local.dir("movies"),
    ];
    let local = Arc::new(local.with_search_results(results));
    let fx = fixture(local.clone());

    let hits = fx
        .router
        .search("movie", &ProviderId::local(), Some(ContentType::Video))
        .await
        .unwrap();
    assert_eq!(names(&hits), vec!["movie.mp4"]);

    let all = fx.router.search("movie", &ProviderId::local(), None).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_remote_content_is_fetched_once_and_cached() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;
    let item = cloud.file("clip.mp4");

    let first = fx.router.resolve_local_url(&item).await.unwrap();
    let second = fx.router.resolve_local_url(&item).await.unwrap();

    assert_eq!(first, second);
    assert!(first.starts_with(fx.cache_dir.path()));
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "/clip.mp4");
    assert_eq!(FakeAdapter::calls(&cloud.fetch_calls), 1);

    let usage = fx.router.cache_usage().await;
    assert_eq!(usage.entries, 1);
    assert_eq!(usage.used_bytes, "/clip.mp4".len() as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_share_one_fetch() {
    let cloud = Arc::new(FakeAdapter::remote("cloud").with_fetch_delay(Duration::from_millis(50)));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;
    let item = cloud.file("clip.mp4");

    let router: Arc<ProviderRouter> = Arc::clone(&fx.router);
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            let item: FileItem = item.clone();
            tokio::spawn(async move { router.resolve_local_url(&item).await })
        })
        .collect();

    let mut paths = Vec::new();
    for task in tasks {
        paths.push(task.await.unwrap().unwrap());
    }
    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(FakeAdapter::calls(&cloud.fetch_calls), 1);
}

#[tokio::test]
async fn test_oversized_content_is_served_uncached() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture_with_cache(Arc::new(FakeAdapter::local()), 4);
    with_remote(&fx, &cloud).await;

    let path = fx.router.resolve_local_url(&cloud.file("huge.mkv")).await.unwrap();

    assert!(!path.starts_with(fx.cache_dir.path()));
    assert_eq!(fx.router.cache_usage().await.entries, 0);
}

#[tokio::test]
async fn test_local_items_bypass_the_cache() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("song.mp3"), b"la").unwrap();
    let local = LocalAdapter::new(root.path(), false, SearchLimits::default()).unwrap();
    let fx = fixture(Arc::new(local));

    let listing = fx.router.contents(None, &ProviderId::local()).await.unwrap();
    let path = fx.router.resolve_local_url(&listing[0]).await.unwrap();

    assert_eq!(path, std::path::Path::new(listing[0].id().as_str()));
    assert_eq!(fx.router.cache_usage().await.entries, 0);
}

#[tokio::test]
async fn test_directories_cannot_be_resolved() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;

    let err = fx.router.resolve_local_url(&cloud.dir("Shows")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    assert_eq!(FakeAdapter::calls(&cloud.fetch_calls), 0);
}

#[tokio::test]
async fn test_hydrate_records_the_local_path_on_the_item() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;
    let mut item = cloud.file("clip.mp4");
    assert!(item.local_url_hint().is_none());

    let path = fx.router.hydrate(&mut item).await.unwrap();
    assert_eq!(item.local_url_hint(), Some(path.as_path()));
    assert!(path.starts_with(fx.cache_dir.path()));

    let store = Arc::new(MemoryStateStore::new());
    let recent = RecentItems::load(store.clone(), 5).await.unwrap();
    recent.record(&item).await.unwrap();
    let reloaded = RecentItems::load(store, 5).await.unwrap();
    assert_eq!(reloaded.items().await[0].local_url_hint(), Some(path.as_path()));

    let mut shows = cloud.dir("Shows");
    assert!(fx.router.hydrate(&mut shows).await.is_err());
    assert!(shows.local_url_hint().is_none());
}

#[tokio::test]
async fn test_delete_invalidates_cached_content() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;
    let item = cloud.file("clip.mp4");

    fx.router.resolve_local_url(&item).await.unwrap();
    fx.router.delete(&item).await.unwrap();

    assert_eq!(fx.router.cache_usage().await.entries, 0);
    fx.router.resolve_local_url(&item).await.unwrap();
    assert_eq!(FakeAdapter::calls(&cloud.fetch_calls), 2);
}

#[tokio::test]
async fn test_clear_and_resize_cache() {
    let cloud = Arc::new(FakeAdapter::remote("cloud"));
    let fx = fixture(Arc::new(FakeAdapter::local()));
    with_remote(&fx, &cloud).await;

    for name in ["a.mp4", "bb.mp4", "ccc.mp4"] {
        fx.router.resolve_local_url(&cloud.file(name)).await.unwrap();
    }
    assert_eq!(fx.router.cache_usage().await.entries, 3);

    // "/bb.mp4" + "/ccc.mp4" fit in 16 bytes; the oldest entry goes
    fx.router.set_cache_max_size(16).await;
    let usage = fx.router.cache_usage().await;
    assert_eq!(usage.max_bytes, 16);
    assert_eq!(usage.entries, 2);

    assert_eq!(fx.router.clear_cache().await, 2);
    assert_eq!(fx.router.cache_usage().await.used_bytes, 0);
}
