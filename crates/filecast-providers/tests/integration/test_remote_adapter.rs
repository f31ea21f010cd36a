//! RemoteAdapter behaviour against a scripted client

use std::sync::atomic::Ordering;
use std::sync::Arc;

use filecast_core::domain::{ContentType, ItemId, ProviderStatus};
use filecast_core::ports::{BackendMutation, CreateKind, IProviderAdapter, RawRecord};
use filecast_core::ErrorKind;

use crate::common::{adapter, ProbeScript, ScriptedClient, Step};

fn id(s: &str) -> ItemId {
    ItemId::new(s).unwrap()
}

#[tokio::test]
async fn test_bad_record_is_skipped_not_fatal() {
    let mut broken = RawRecord::file("2", "broken.mp4", 10);
    broken.modified = Some("not a date".into());
    let client = Arc::new(ScriptedClient::new().with_listing(
        "root",
        vec![
            Step::Record(RawRecord::file("1", "a.mp4", 10)),
            Step::Record(broken),
            Step::Record(RawRecord::folder("3", "Shows")),
        ],
    ));

    let items = adapter(client).list(None).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name(), "a.mp4");
    assert_eq!(items[1].name(), "Shows");
    assert_eq!(items[1].parent_id().map(ItemId::as_str), Some("root"));
}

#[tokio::test]
async fn test_broken_enumeration_fails_the_listing() {
    let client = Arc::new(ScriptedClient::new().with_listing(
        "root",
        vec![Step::Record(RawRecord::file("1", "a", 1)), Step::Fail(401)],
    ));

    let err = adapter(client).list(None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationRequired);
    assert_eq!(err.provider().map(|p| p.as_str()), Some("cloud"));
}

#[tokio::test]
async fn test_unknown_container_is_file_not_found() {
    let client = Arc::new(ScriptedClient::new());
    let err = adapter(client).list(Some(&id("nowhere"))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[tokio::test]
async fn test_create_refuses_existing_name() {
    let client = Arc::new(ScriptedClient::new().with_listing(
        "root",
        vec![Step::Record(RawRecord::folder("d", "Music"))],
    ));
    let adapter = adapter(client.clone());

    let err = adapter
        .create(None, "Music", CreateKind::Directory)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(client.mutations().is_empty());

    let made = adapter.create(None, "Films", CreateKind::Directory).await.unwrap();
    assert!(made.is_directory());
    assert_eq!(made.id().as_str(), "new-Films");
    assert_eq!(
        client.mutations(),
        vec![BackendMutation::CreateFolder {
            parent: "root".into(),
            name: "Films".into()
        }]
    );
}

#[tokio::test]
async fn test_unsupported_mutation_surfaces_as_not_supported() {
    let client = Arc::new(ScriptedClient::new());
    let adapter = adapter(client);

    let err = adapter.move_item(&id("a"), &id("b")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    let err = adapter.copy(&id("a"), &id("b")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
}

#[tokio::test]
async fn test_search_falls_back_to_breadth_first_walk() {
    let client = Arc::new(
        ScriptedClient::new()
            .with_listing(
                "root",
                vec![
                    Step::Record(RawRecord::folder("d1", "Holiday")),
                    Step::Record(RawRecord::file("f1", "holiday.jpg", 5)),
                ],
            )
            .with_listing("d1", vec![Step::Record(RawRecord::file("f2", "Beach holiday.mp4", 9))]),
    );
    let adapter = adapter(client);

    let all = adapter.search("HOLIDAY", None, None).await.unwrap();
    let names: Vec<&str> = all.iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["Holiday", "holiday.jpg", "Beach holiday.mp4"]);

    let videos = adapter
        .search("holiday", None, Some(ContentType::Video))
        .await
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].id().as_str(), "f2");
}

#[tokio::test]
async fn test_search_prefers_server_side_results() {
    let client = Arc::new(
        ScriptedClient::new().with_search_hits(vec![RawRecord::file("s1", "song.mp3", 3)]),
    );
    let adapter = adapter(client.clone());

    let found = adapter.search("song", None, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(client.enumerate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_query_never_enumerates() {
    let client = Arc::new(ScriptedClient::new());
    let adapter = adapter(client.clone());
    assert!(adapter.search("", None, None).await.unwrap().is_empty());
    assert_eq!(client.enumerate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resolve_local_url_fetches_bytes() {
    let client = Arc::new(ScriptedClient::new().with_listing(
        "root",
        vec![Step::Record(RawRecord::file("f1", "a.mp4", 2))],
    ));
    let adapter = adapter(client.clone());
    let item = adapter.get_item(&id("f1")).await.unwrap();

    let path = adapter.resolve_local_url(&item).await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"f1");
    assert_eq!(client.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_probe_outcomes() {
    let up = adapter(Arc::new(ScriptedClient::new()));
    assert_eq!(up.probe().await.status, ProviderStatus::Available);

    let down = adapter(Arc::new(ScriptedClient::new().with_probe(ProbeScript::Down)));
    assert_eq!(down.probe().await.status, ProviderStatus::Offline);

    let locked = adapter(Arc::new(ScriptedClient::new().with_probe(ProbeScript::Status(401))));
    assert_eq!(locked.probe().await.status, ProviderStatus::Unauthorized);

    let broken = adapter(Arc::new(ScriptedClient::new().with_probe(ProbeScript::Status(500))));
    let outcome = broken.probe().await;
    assert_eq!(outcome.status, ProviderStatus::Error);
    assert!(outcome.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_probe_reports_offline() {
    let hung = adapter(Arc::new(ScriptedClient::new().with_probe(ProbeScript::Hang)));
    let outcome = hung.probe().await;
    assert_eq!(outcome.status, ProviderStatus::Offline);
    assert!(outcome.error.unwrap().contains("timed out"));
}
