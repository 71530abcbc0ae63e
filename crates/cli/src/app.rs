//! Wiring of the store, repositories, queue and sync for one CLI run.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use matchng_events::{SharedChannel, SyncNotifier};
use matchng_matching::RankingEngine;
use matchng_offline::{
    ActionQueue, ConnectivityMonitor, ConnectivityProbe, ConnectivityState, HttpProbe, JobActions,
    ManualProbe, OfflineConfig, SyncCoordinator,
};
use matchng_store::{
    DebouncedWriter, JobRepository, PersistentStore, SqliteBackend, SqliteChangeFeed,
    StorageBackend, StoreConfig, UserRepository,
};

pub struct App {
    pub store: Arc<PersistentStore>,
    pub users: Arc<UserRepository>,
    pub jobs: JobRepository,
    pub drafts: DebouncedWriter,
    pub queue: Arc<ActionQueue>,
    pub actions: JobActions,
    pub coordinator: Arc<SyncCoordinator>,
    pub engine: RankingEngine,
    pub offline: OfflineConfig,
    feed: Option<Arc<SqliteChangeFeed>>,
}

impl App {
    /// Open the SQLite store named by the config (or the default path) and
    /// attach to its change feed, so other processes on the same file hear
    /// this one's writes.
    pub async fn open(store_config: StoreConfig, offline: OfflineConfig) -> anyhow::Result<Self> {
        let backend = match &store_config.db_path {
            Some(path) => SqliteBackend::open(path, Some(store_config.quota_bytes)).await?,
            None => SqliteBackend::open_default(Some(store_config.quota_bytes)).await?,
        };
        let feed = SqliteChangeFeed::attach(&backend, store_config.change_poll)
            .await
            .context("failed to attach to the store's change feed")?;
        info!(db_path = ?store_config.db_path, "store opened");
        Self::with_backend(Arc::new(backend), Some(feed), store_config, offline)
    }

    pub fn with_backend(
        backend: Arc<dyn StorageBackend>,
        feed: Option<Arc<SqliteChangeFeed>>,
        store_config: StoreConfig,
        offline: OfflineConfig,
    ) -> anyhow::Result<Self> {
        let notifier = Arc::new(match &feed {
            Some(feed) => {
                let shared: SharedChannel = feed.clone();
                SyncNotifier::with_shared_channel(shared)
            }
            None => SyncNotifier::new(),
        });
        let store = Arc::new(PersistentStore::new(backend, notifier, &store_config));

        let users = Arc::new(UserRepository::new(Arc::clone(&store)));
        let jobs = JobRepository::new(Arc::clone(&store));
        let drafts = DebouncedWriter::new(Arc::clone(&store), store_config.debounce);
        let queue = Arc::new(ActionQueue::new(
            Arc::clone(&store),
            Arc::clone(&users),
            offline.retry.clone(),
            offline.replay_delay,
        ));

        // Without a probe URL there is nothing to ask; assume the network is up.
        let probe: Arc<dyn ConnectivityProbe> = match &offline.probe_url {
            Some(url) => Arc::new(
                HttpProbe::new(url.clone())
                    .with_context(|| format!("failed to build connectivity probe for {url}"))?,
            ),
            None => Arc::new(ManualProbe::new(true)),
        };
        let monitor = Arc::new(ConnectivityMonitor::new(
            probe,
            Arc::clone(store.notifier()),
            ConnectivityState::Online,
        ));

        let actions = JobActions::new(Arc::clone(&users), Arc::clone(&queue), Arc::clone(&monitor));
        let coordinator = Arc::new(SyncCoordinator::new(monitor, Arc::clone(&queue)));

        Ok(Self {
            store,
            users,
            jobs,
            drafts,
            queue,
            actions,
            coordinator,
            engine: RankingEngine::default(),
            offline,
            feed,
        })
    }

    /// Write pending drafts and hand outstanding change signals to the
    /// medium. Call once, before exiting.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let flushed = self
            .drafts
            .flush()
            .await
            .context("failed to write pending drafts");
        if let Some(feed) = &self.feed {
            feed.shutdown().await;
        }
        flushed
    }
}
