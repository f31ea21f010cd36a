//! Shared test helpers: a scripted `IBackendClient`

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tempfile::TempDir;

use filecast_core::domain::ProviderId;
use filecast_core::ports::{BackendMutation, IBackendClient, RawRecord, SearchLimits};
use filecast_core::BackendStatus;
use filecast_providers::RemoteAdapter;

/// One scripted element of an enumeration
#[derive(Clone)]
pub enum Step {
    Record(RawRecord),
    /// The enumeration breaks with this status
    Fail(u16),
}

#[derive(Clone, Copy)]
pub enum ProbeScript {
    Up,
    Down,
    Hang,
    Status(u16),
}

pub struct ScriptedClient {
    listings: Mutex<HashMap<String, Vec<Step>>>,
    search_hits: Mutex<Option<Vec<RawRecord>>>,
    probe: Mutex<ProbeScript>,
    mutations: Mutex<Vec<BackendMutation>>,
    pub enumerate_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    downloads: TempDir,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            listings: Mutex::new(HashMap::new()),
            search_hits: Mutex::new(None),
            probe: Mutex::new(ProbeScript::Up),
            mutations: Mutex::new(Vec::new()),
            enumerate_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            downloads: tempfile::tempdir().expect("download dir"),
        }
    }

    pub fn with_listing(self, container: &str, steps: Vec<Step>) -> Self {
        self.listings
            .lock()
            .unwrap()
            .insert(container.to_string(), steps);
        self
    }

    pub fn with_search_hits(self, hits: Vec<RawRecord>) -> Self {
        *self.search_hits.lock().unwrap() = Some(hits);
        self
    }

    pub fn with_probe(self, probe: ProbeScript) -> Self {
        *self.probe.lock().unwrap() = probe;
        self
    }

    pub fn mutations(&self) -> Vec<BackendMutation> {
        self.mutations.lock().unwrap().clone()
    }
}

#[async_trait]
impl IBackendClient for ScriptedClient {
    fn root_container(&self) -> String {
        "root".to_string()
    }

    async fn enumerate(
        &self,
        container: &str,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<RawRecord>>> {
        self.enumerate_calls.fetch_add(1, Ordering::SeqCst);
        let steps = self
            .listings
            .lock()
            .unwrap()
            .get(container)
            .cloned()
            .ok_or_else(|| BackendStatus::new(404, format!("no container {container}")))?;
        let items: Vec<anyhow::Result<RawRecord>> = steps
            .into_iter()
            .map(|step| match step {
                Step::Record(record) => Ok(record),
                Step::Fail(status) => Err(BackendStatus::new(status, "enumeration broke").into()),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }

    async fn record(&self, item: &str) -> anyhow::Result<RawRecord> {
        let listings = self.listings.lock().unwrap();
        listings
            .values()
            .flatten()
            .find_map(|step| match step {
                Step::Record(r) if r.id.as_deref() == Some(item) => Some(r.clone()),
                _ => None,
            })
            .ok_or_else(|| BackendStatus::new(404, format!("no item {item}")).into())
    }

    async fn fetch_bytes(&self, item: &str) -> anyhow::Result<PathBuf> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let path = self.downloads.path().join(item.replace('/', "_"));
        tokio::fs::write(&path, item.as_bytes()).await?;
        Ok(path)
    }

    async fn mutate(&self, mutation: &BackendMutation) -> anyhow::Result<Option<RawRecord>> {
        self.mutations.lock().unwrap().push(mutation.clone());
        match mutation {
            BackendMutation::CreateFolder { parent, name } => {
                Ok(Some(RawRecord::folder(format!("new-{name}"), name.clone()).with_parent(parent.clone())))
            }
            BackendMutation::CreateFile { parent, name } => {
                Ok(Some(RawRecord::file(format!("new-{name}"), name.clone(), 0).with_parent(parent.clone())))
            }
            BackendMutation::Delete { .. } => Ok(None),
            BackendMutation::Rename { item, new_name } => Ok(Some(RawRecord::file(item.clone(), new_name.clone(), 1))),
            BackendMutation::Move { .. } | BackendMutation::Copy { .. } => {
                Err(BackendStatus::new(501, "not implemented").into())
            }
        }
    }

    async fn probe(&self) -> anyhow::Result<bool> {
        let script = *self.probe.lock().unwrap();
        match script {
            ProbeScript::Up => Ok(true),
            ProbeScript::Down => Ok(false),
            ProbeScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            }
            ProbeScript::Status(status) => Err(BackendStatus::new(status, "probe failed").into()),
        }
    }

    async fn search(&self, query: &str, _container: &str) -> anyhow::Result<Option<Vec<RawRecord>>> {
        let hits = self.search_hits.lock().unwrap().clone();
        Ok(hits.map(|records| {
            records
                .into_iter()
                .filter(|r| {
                    r.name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&query.to_lowercase()))
                })
                .collect()
        }))
    }
}

/// Wrap a client in a `RemoteAdapter` with a one second probe timeout
pub fn adapter(client: Arc<ScriptedClient>) -> RemoteAdapter {
    RemoteAdapter::new(
        ProviderId::new("cloud").unwrap(),
        client,
        Duration::from_secs(1),
        SearchLimits::default(),
    )
    .expect("adapter")
}
