//! The collection orchestrator.
//!
//! A [`Collector`] owns the data sources and the database. It restores each
//! source's persisted identity, starts every watchable source, then loops
//! over three inputs: async change events from watchers, a poll timer that
//! triggers a full collection cycle, and cancellation.
//!
//! The collector is the only writer. Persistence calls run inline on the
//! main loop, so no two changes are ever diffed against the same row
//! concurrently.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CollectorConfig;
use crate::error::CoreError;
use crate::event::{AsyncChangeEvent, AsyncEventType};
use crate::model::{
    DataChangeEvent, DeploymentManager, Entity, EntityKind, Location, Model, OCloudSite, Resource,
    ResourcePool, ResourceType,
};
use crate::notifier::{Notification, NotificationHandler};
use crate::source::{
    DataSource, DataSourceLoader, DeploymentManagerDataSource, NoopLoader, ResourceDataSource,
    build_data_sources,
};
use crate::store::Database;

/// Capacity of the channel shared by every watchable source.
pub const ASYNC_EVENT_BUFFER_SIZE: usize = 10;

/// Shortest accepted poll interval; shorter values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Collector {
    db: Database,
    notifier: Arc<dyn NotificationHandler>,
    sources: Vec<Arc<dyn DataSource>>,
    loader: Arc<dyn DataSourceLoader>,
    poll_interval: Duration,
    events_tx: mpsc::Sender<AsyncChangeEvent>,
    events_rx: mpsc::Receiver<AsyncChangeEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Collector {
    /// Builds the collector and every data source named by `config`.
    pub fn new(
        db: Database,
        notifier: Arc<dyn NotificationHandler>,
        config: &CollectorConfig,
    ) -> Result<Self, CoreError> {
        let (sources, loader) = build_data_sources(config)?;
        Ok(Self::with_sources(
            db,
            notifier,
            sources,
            loader,
            config.poll_interval,
        ))
    }

    pub fn with_sources(
        db: Database,
        notifier: Arc<dyn NotificationHandler>,
        sources: Vec<Arc<dyn DataSource>>,
        loader: Arc<dyn DataSourceLoader>,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(ASYNC_EVENT_BUFFER_SIZE);
        if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
                "poll interval too short; using the minimum"
            );
        }
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        Self {
            db,
            notifier,
            sources,
            loader,
            poll_interval,
            events_tx,
            events_rx,
            tasks: Vec::new(),
        }
    }

    /// Collector without dynamic discovery.
    pub fn with_static_sources(
        db: Database,
        notifier: Arc<dyn NotificationHandler>,
        sources: Vec<Arc<dyn DataSource>>,
        poll_interval: Duration,
    ) -> Self {
        Self::with_sources(db, notifier, sources, Arc::new(NoopLoader), poll_interval)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Runs until `cancel` fires.
    ///
    /// Fails only during startup: identity bootstrap or watch registration.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        self.start(&cancel).await?;
        self.execute(&cancel).await;

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.poll_interval,
            self.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            sources = self.sources.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "collector running"
        );
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.execute(&cancel).await,
                Some(event) = self.events_rx.recv() => {
                    if let Err(e) = self.handle_async_event(event).await {
                        warn!(error = %e, "failed to handle async event");
                    }
                }
            }
        }

        info!("collector stopping; waiting for watch tasks");
        join_all(self.tasks.drain(..)).await;
        info!("collector stopped");
        Ok(())
    }

    /// Bootstraps every configured source and starts its watch.
    ///
    /// Dynamic sources are picked up by the first [`execute`](Self::execute).
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), CoreError> {
        for source in &self.sources {
            self.init_source(source.as_ref())?;
        }

        for source in &self.sources {
            let Some(watchable) = source.as_watchable() else {
                continue;
            };
            let handles = watchable.watch(cancel).map_err(|e| {
                error!(source = source.name(), error = %e, "failed to start watch");
                CoreError::WatchFailed {
                    source_name: source.name().to_owned(),
                    reason: e.to_string(),
                }
            })?;
            info!(source = source.name(), "watch started");
            self.tasks.extend(handles);
        }
        Ok(())
    }

    /// Restores the persisted identity of `source`, creating it on first use.
    fn init_source(&self, source: &dyn DataSource) -> Result<(), CoreError> {
        let name = source.name();
        if let Some(record) = self.db.data_source_by_name(name)? {
            info!(
                source = name,
                id = %record.data_source_id,
                generation = record.generation_id,
                "restored data source"
            );
            source.init(
                record.data_source_id,
                record.generation_id,
                self.events_tx.clone(),
            );
        } else {
            let record = self.db.create_data_source(name, 0)?;
            info!(source = name, id = %record.data_source_id, "created data source");
            source.init(record.data_source_id, 0, self.events_tx.clone());
        }
        Ok(())
    }

    /// Appends sources discovered by the loader that are not yet known.
    async fn load_sources(&mut self, cancel: &CancellationToken) {
        let loaded = match self.loader.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "failed to load dynamic data sources");
                return;
            }
        };

        let mut known: HashSet<String> =
            self.sources.iter().map(|s| s.name().to_owned()).collect();
        for source in loaded {
            if !known.insert(source.name().to_owned()) {
                continue;
            }
            if let Err(e) = self.init_source(source.as_ref()) {
                warn!(source = source.name(), error = %e, "failed to initialize data source");
                continue;
            }
            if let Some(watchable) = source.as_watchable() {
                match watchable.watch(cancel) {
                    Ok(handles) => self.tasks.extend(handles),
                    Err(e) => {
                        warn!(source = source.name(), error = %e, "failed to start watch");
                        continue;
                    }
                }
            }
            info!(source = source.name(), "added dynamic data source");
            self.sources.push(source);
        }
    }

    // ── Poll cycle ───────────────────────────────────────────────────

    /// One full collection cycle over every poll-capable source.
    ///
    /// A failing source is logged and does not stop the others.
    pub async fn execute(&mut self, cancel: &CancellationToken) {
        self.load_sources(cancel).await;

        for source in &self.sources {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(resource_source) = source.as_resource_source() {
                if let Err(e) = self.collect_resources(resource_source).await {
                    warn!(source = source.name(), error = %e, "resource collection failed");
                }
            }
            if let Some(dm_source) = source.as_deployment_manager_source() {
                if let Err(e) = self.collect_deployment_managers(dm_source).await {
                    warn!(source = source.name(), error = %e, "deployment manager collection failed");
                }
            }
        }
    }

    async fn collect_resources(&self, source: &dyn ResourceDataSource) -> Result<(), CoreError> {
        let generation = source.incr_generation();
        debug!(source = source.name(), generation, "collecting resources");

        let pools = source.resource_pools().await?;
        let fetched = source.resources(&pools).await?;

        let mut types: BTreeMap<Uuid, ResourceType> = BTreeMap::new();
        let mut resources = Vec::with_capacity(fetched.len());
        for resource in fetched {
            match source.classify(&resource) {
                Ok(resource_type) => {
                    types
                        .entry(resource_type.resource_type_id)
                        .or_insert(resource_type);
                    resources.push(resource);
                }
                Err(e) => warn!(
                    source = source.name(),
                    resource = %resource.resource_id,
                    error = %e,
                    "cannot classify resource; skipping"
                ),
            }
        }

        for pool in &pools {
            self.persist(pool).await?;
        }
        for resource_type in types.values() {
            self.persist(resource_type).await?;
        }
        for resource in &resources {
            self.persist(resource).await?;
        }
        self.db
            .update_data_source_generation(source.id(), generation)?;

        let data_source_id = source.id();
        let purged = self.purge_stale::<Resource>(data_source_id, generation).await?
            + self.purge_stale::<ResourcePool>(data_source_id, generation).await?
            + self.purge_stale::<ResourceType>(data_source_id, generation).await?;

        info!(
            source = source.name(),
            generation,
            pools = pools.len(),
            resource_types = types.len(),
            resources = resources.len(),
            purged,
            "resource collection complete"
        );
        Ok(())
    }

    async fn collect_deployment_managers(
        &self,
        source: &dyn DeploymentManagerDataSource,
    ) -> Result<(), CoreError> {
        let generation = source.incr_generation();
        let managers = source.deployment_managers().await?;
        for manager in &managers {
            self.persist(manager).await?;
        }
        self.db
            .update_data_source_generation(source.id(), generation)?;

        let purged = self
            .purge_stale::<DeploymentManager>(source.id(), generation)
            .await?;
        info!(
            source = source.name(),
            generation,
            deployment_managers = managers.len(),
            purged,
            "deployment manager collection complete"
        );
        Ok(())
    }

    // ── Async events ─────────────────────────────────────────────────

    /// Applies one event reported by a watchable source.
    pub async fn handle_async_event(&self, event: AsyncChangeEvent) -> Result<(), CoreError> {
        debug!(
            data_source = %event.data_source_id,
            event_type = %event.event_type,
            kind = %event.kind,
            "async event"
        );
        match event.event_type {
            AsyncEventType::Updated | AsyncEventType::Deleted => {
                let Some(entity) = event.object else {
                    return Err(CoreError::Internal(format!(
                        "{} event without an object",
                        event.event_type
                    )));
                };
                let deleted = event.event_type == AsyncEventType::Deleted;
                match entity {
                    Entity::ResourcePool(e) => self.apply(&e, deleted).await,
                    Entity::Resource(e) => self.apply(&e, deleted).await,
                    Entity::ResourceType(e) => self.apply(&e, deleted).await,
                    Entity::DeploymentManager(e) => self.apply(&e, deleted).await,
                    Entity::Location(e) => self.apply(&e, deleted).await,
                    Entity::OCloudSite(e) => self.apply(&e, deleted).await,
                }
            }
            AsyncEventType::SyncComplete => {
                self.handle_sync_complete(event.data_source_id, event.kind, &event.keys)
                    .await
            }
        }
    }

    async fn apply<T: Model>(&self, obj: &T, deleted: bool) -> Result<(), CoreError> {
        if deleted {
            self.delete(obj).await
        } else {
            self.persist(obj).await
        }
    }

    /// Removes rows of `kind` owned by the source that the latest full
    /// listing no longer contains.
    async fn handle_sync_complete(
        &self,
        data_source_id: Uuid,
        kind: EntityKind,
        keys: &[Uuid],
    ) -> Result<(), CoreError> {
        let purged = match kind {
            EntityKind::ResourcePool => self.purge_missing::<ResourcePool>(data_source_id, keys).await?,
            EntityKind::Resource => self.purge_missing::<Resource>(data_source_id, keys).await?,
            EntityKind::ResourceType => self.purge_missing::<ResourceType>(data_source_id, keys).await?,
            EntityKind::DeploymentManager => {
                self.purge_missing::<DeploymentManager>(data_source_id, keys)
                    .await?
            }
            EntityKind::Location => self.purge_missing::<Location>(data_source_id, keys).await?,
            EntityKind::OCloudSite => self.purge_missing::<OCloudSite>(data_source_id, keys).await?,
        };
        info!(
            data_source = %data_source_id,
            %kind,
            keys = keys.len(),
            purged,
            "sync complete"
        );
        Ok(())
    }

    // ── Persistence helpers ──────────────────────────────────────────

    async fn persist<T: Model>(&self, obj: &T) -> Result<(), CoreError> {
        let event = self.db.persist_model(obj)?;
        self.publish(event).await;
        Ok(())
    }

    async fn delete<T: Model>(&self, obj: &T) -> Result<(), CoreError> {
        let event = self.db.delete_model(obj)?;
        self.publish(event).await;
        Ok(())
    }

    async fn purge_stale<T: Model>(
        &self,
        data_source_id: Uuid,
        generation: i64,
    ) -> Result<usize, CoreError> {
        let stale = self.db.find_stale::<T>(data_source_id, generation)?;
        for obj in &stale {
            debug!(table = T::TABLE, id = %obj.id(), "deleting stale row");
            self.delete(obj).await?;
        }
        Ok(stale.len())
    }

    async fn purge_missing<T: Model>(
        &self,
        data_source_id: Uuid,
        keys: &[Uuid],
    ) -> Result<usize, CoreError> {
        let missing = self.db.find_not_in::<T>(data_source_id, keys)?;
        for obj in &missing {
            debug!(table = T::TABLE, id = %obj.id(), "deleting row absent from listing");
            self.delete(obj).await?;
        }
        Ok(missing.len())
    }

    async fn publish(&self, event: Option<DataChangeEvent>) {
        if let Some(event) = event {
            self.notifier.notify(Notification::from(&event)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::source::{SourceState, WatchableDataSource};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    #[async_trait]
    impl NotificationHandler for Recorder {
        async fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    struct Plain {
        name: &'static str,
        state: Arc<SourceState>,
    }

    impl DataSource for Plain {
        fn name(&self) -> &str {
            self.name
        }

        fn state(&self) -> &SourceState {
            &self.state
        }
    }

    fn plain(name: &'static str) -> Arc<Plain> {
        Arc::new(Plain {
            name,
            state: SourceState::new(),
        })
    }

    /// Watchable source whose watch can never be registered.
    struct Unwatchable {
        state: Arc<SourceState>,
    }

    impl DataSource for Unwatchable {
        fn name(&self) -> &str {
            "Location"
        }

        fn state(&self) -> &SourceState {
            &self.state
        }

        fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
            Some(self)
        }
    }

    impl WatchableDataSource for Unwatchable {
        fn watch(&self, _cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
            Err(CoreError::Internal("hub unreachable".into()))
        }
    }

    /// Resource source that only counts its poll cycles.
    struct Counting {
        state: Arc<SourceState>,
        polls: AtomicUsize,
    }

    impl DataSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn state(&self) -> &SourceState {
            &self.state
        }

        fn as_resource_source(&self) -> Option<&dyn ResourceDataSource> {
            Some(self)
        }
    }

    #[async_trait]
    impl ResourceDataSource for Counting {
        async fn resource_pools(&self) -> Result<Vec<ResourcePool>, CoreError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn resources(&self, _pools: &[ResourcePool]) -> Result<Vec<Resource>, CoreError> {
            Ok(Vec::new())
        }

        fn classify(&self, _resource: &Resource) -> Result<ResourceType, CoreError> {
            Err(CoreError::Internal("nothing to classify".into()))
        }
    }

    fn unwatchable_collector() -> Collector {
        Collector::with_static_sources(
            Database::open_in_memory().unwrap(),
            Arc::new(Recorder::default()),
            vec![Arc::new(Unwatchable {
                state: SourceState::new(),
            }) as Arc<dyn DataSource>],
            Duration::from_secs(60),
        )
    }

    fn site(id: u128, data_source_id: Uuid) -> OCloudSite {
        OCloudSite {
            o_cloud_site_id: Uuid::from_u128(id),
            name: format!("site-{id}"),
            data_source_id,
            ..OCloudSite::default()
        }
    }

    #[tokio::test]
    async fn start_creates_then_restores_identity() {
        let db = Database::open_in_memory().unwrap();
        let cancel = CancellationToken::new();

        let first = plain("OCloudSite");
        let mut collector = Collector::with_static_sources(
            db.clone(),
            Arc::new(Recorder::default()),
            vec![first.clone() as Arc<dyn DataSource>],
            Duration::from_secs(60),
        );
        collector.start(&cancel).await.unwrap();
        let id = first.id();
        assert!(!id.is_nil());

        db.update_data_source_generation(id, 5).unwrap();

        let second = plain("OCloudSite");
        let mut collector = Collector::with_static_sources(
            db,
            Arc::new(Recorder::default()),
            vec![second.clone() as Arc<dyn DataSource>],
            Duration::from_secs(60),
        );
        collector.start(&cancel).await.unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(second.generation(), 5);
    }

    #[tokio::test]
    async fn updates_and_deletes_are_persisted_and_notified() {
        let db = Database::open_in_memory().unwrap();
        let recorder = Arc::new(Recorder::default());
        let collector = Collector::with_static_sources(
            db.clone(),
            recorder.clone(),
            Vec::new(),
            Duration::from_secs(60),
        );
        let ds = Uuid::from_u128(100);

        collector
            .handle_async_event(AsyncChangeEvent::updated(ds, site(1, ds).into()))
            .await
            .unwrap();
        collector
            .handle_async_event(AsyncChangeEvent::updated(ds, site(1, ds).into()))
            .await
            .unwrap();
        collector
            .handle_async_event(AsyncChangeEvent::deleted(ds, site(1, ds).into()))
            .await
            .unwrap();

        assert!(db.find::<OCloudSite>(Uuid::from_u128(1)).unwrap().is_none());
        let types: Vec<u8> = recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.payload.notification_event_type)
            .collect();
        assert_eq!(types, vec![0, 2]);
    }

    #[tokio::test]
    async fn sync_complete_purges_only_missing_rows_of_that_source() {
        let db = Database::open_in_memory().unwrap();
        let collector = Collector::with_static_sources(
            db.clone(),
            Arc::new(Recorder::default()),
            Vec::new(),
            Duration::from_secs(60),
        );
        let ds = Uuid::from_u128(100);
        let other_ds = Uuid::from_u128(200);

        for obj in [site(1, ds), site(2, ds), site(3, other_ds)] {
            db.persist_model(&obj).unwrap();
        }

        collector
            .handle_async_event(AsyncChangeEvent::sync_complete(
                ds,
                EntityKind::OCloudSite,
                vec![Uuid::from_u128(1)],
            ))
            .await
            .unwrap();

        assert!(db.find::<OCloudSite>(Uuid::from_u128(1)).unwrap().is_some());
        assert!(db.find::<OCloudSite>(Uuid::from_u128(2)).unwrap().is_none());
        assert!(db.find::<OCloudSite>(Uuid::from_u128(3)).unwrap().is_some());
    }

    #[tokio::test]
    async fn event_without_object_is_rejected() {
        let collector = Collector::with_static_sources(
            Database::open_in_memory().unwrap(),
            Arc::new(Recorder::default()),
            Vec::new(),
            Duration::from_secs(60),
        );
        let event = AsyncChangeEvent {
            data_source_id: Uuid::nil(),
            event_type: AsyncEventType::Updated,
            kind: EntityKind::Location,
            object: None,
            keys: Vec::new(),
        };
        assert!(collector.handle_async_event(event).await.is_err());
    }

    #[tokio::test]
    async fn run_returns_once_cancelled() {
        let collector = Collector::with_static_sources(
            Database::open_in_memory().unwrap(),
            Arc::new(Recorder::default()),
            vec![plain("idle") as Arc<dyn DataSource>],
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        collector.run(cancel).await.unwrap();
    }

    #[tokio::test]
    async fn failed_watch_registration_aborts_start() {
        let mut collector = unwatchable_collector();
        let err = collector.start(&CancellationToken::new()).await.unwrap_err();
        match err {
            CoreError::WatchFailed {
                source_name,
                reason,
            } => {
                assert_eq!(source_name, "Location");
                assert!(reason.contains("hub unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_fails_when_a_watch_cannot_start() {
        let cancel = CancellationToken::new();
        let err = unwatchable_collector().run(cancel.clone()).await.unwrap_err();
        assert!(matches!(err, CoreError::WatchFailed { .. }));
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn zero_poll_interval_is_raised_to_the_minimum() {
        let collector = Collector::with_static_sources(
            Database::open_in_memory().unwrap(),
            Arc::new(Recorder::default()),
            vec![plain("idle") as Arc<dyn DataSource>],
            Duration::ZERO,
        );
        assert_eq!(collector.poll_interval, MIN_POLL_INTERVAL);

        let cancel = CancellationToken::new();
        cancel.cancel();
        collector.run(cancel).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn poll_tick_fires_under_a_steady_event_stream() {
        let counting = Arc::new(Counting {
            state: SourceState::new(),
            polls: AtomicUsize::new(0),
        });
        let collector = Collector::with_static_sources(
            Database::open_in_memory().unwrap(),
            Arc::new(Recorder::default()),
            vec![counting.clone() as Arc<dyn DataSource>],
            MIN_POLL_INTERVAL,
        );
        let cancel = CancellationToken::new();

        let events = collector.events_tx.clone();
        let flood = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    let event =
                        AsyncChangeEvent::sync_complete(Uuid::nil(), EntityKind::OCloudSite, Vec::new());
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        sent = events.send(event) => if sent.is_err() { break },
                    }
                }
            })
        };

        let wait_for_second_poll = async {
            for _ in 0..100 {
                if counting.polls.load(Ordering::SeqCst) >= 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(collector.run(cancel.clone()), wait_for_second_poll);

        result.unwrap();
        flood.await.unwrap();
        assert!(counting.polls.load(Ordering::SeqCst) >= 2);
    }
}
