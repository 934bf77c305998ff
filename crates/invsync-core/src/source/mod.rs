// ── Data sources ──
//
// A data source adapts one external backend. Every source carries a
// persisted identity and generation counter (`DataSource`); capabilities
// are opt-in through the narrower traits below and discovered at runtime
// via the `as_*` accessors.

pub mod cluster;
pub mod hwplugin;
pub mod loader;
pub mod location;
pub mod ocloud_site;
pub mod resource_pool;
mod watch;

pub use cluster::ClusterDataSource;
pub use hwplugin::HwPluginDataSource;
pub use loader::HwPluginLoader;
pub use location::LocationDataSource;
pub use ocloud_site::OCloudSiteDataSource;
pub use resource_pool::ResourcePoolDataSource;

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use invsync_api::kube::HubClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::CollectorConfig;
use crate::error::CoreError;
use crate::event::AsyncChangeEvent;
use crate::model::{DeploymentManager, Resource, ResourcePool, ResourceType};

// ── SourceState ──────────────────────────────────────────────────────

/// Identity, generation and event sink shared by a source and its tasks.
#[derive(Debug, Default)]
pub struct SourceState {
    id: ArcSwapOption<Uuid>,
    generation: AtomicI64,
    events: ArcSwapOption<mpsc::Sender<AsyncChangeEvent>>,
}

impl SourceState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Persisted identifier; nil until `init`.
    pub fn id(&self) -> Uuid {
        self.id.load().as_deref().copied().unwrap_or_default()
    }

    pub fn init(&self, id: Uuid, generation: i64, events: mpsc::Sender<AsyncChangeEvent>) {
        self.id.store(Some(Arc::new(id)));
        self.generation.store(generation, Ordering::SeqCst);
        self.events.store(Some(Arc::new(events)));
    }

    pub fn generation(&self) -> i64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn set_generation(&self, value: i64) {
        self.generation.store(value, Ordering::SeqCst);
    }

    pub fn incr_generation(&self) -> i64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn sender(&self) -> Option<mpsc::Sender<AsyncChangeEvent>> {
        self.events.load_full().map(|sender| (*sender).clone())
    }
}

/// Sends `event` on the shared channel, giving up if `cancel` fires first.
pub(crate) async fn send_event(
    state: &SourceState,
    source_name: &str,
    cancel: &CancellationToken,
    event: AsyncChangeEvent,
) -> Result<(), CoreError> {
    let sender = state.sender().ok_or_else(|| CoreError::NotInitialized {
        source_name: source_name.to_owned(),
    })?;

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!(source = source_name, "cancelled while sending async event; dropping it");
            Err(CoreError::Cancelled)
        }
        result = sender.send(event) => result.map_err(|_| CoreError::ChannelClosed),
    }
}

// ── Capability traits ────────────────────────────────────────────────

/// Minimal contract every backend adapter fulfils.
pub trait DataSource: Send + Sync {
    /// Stable human-readable name; the persisted identity is keyed on it.
    fn name(&self) -> &str;

    fn state(&self) -> &SourceState;

    fn id(&self) -> Uuid {
        self.state().id()
    }

    fn init(&self, id: Uuid, generation: i64, events: mpsc::Sender<AsyncChangeEvent>) {
        self.state().init(id, generation, events);
    }

    fn generation(&self) -> i64 {
        self.state().generation()
    }

    fn set_generation(&self, value: i64) {
        self.state().set_generation(value);
    }

    fn incr_generation(&self) -> i64 {
        self.state().incr_generation()
    }

    fn as_resource_source(&self) -> Option<&dyn ResourceDataSource> {
        None
    }

    fn as_deployment_manager_source(&self) -> Option<&dyn DeploymentManagerDataSource> {
        None
    }

    fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
        None
    }
}

/// A poll-capable inventory source.
#[async_trait]
pub trait ResourceDataSource: DataSource {
    async fn resource_pools(&self) -> Result<Vec<ResourcePool>, CoreError>;

    async fn resources(&self, pools: &[ResourcePool]) -> Result<Vec<Resource>, CoreError>;

    /// Derives the resource type a resource belongs to.
    fn classify(&self, resource: &Resource) -> Result<ResourceType, CoreError>;
}

/// A poll-capable cluster source.
#[async_trait]
pub trait DeploymentManagerDataSource: DataSource {
    async fn deployment_managers(&self) -> Result<Vec<DeploymentManager>, CoreError>;
}

/// A source that reports mutations through the shared event channel.
pub trait WatchableDataSource: DataSource {
    /// Spawns the watch tasks. They run until `cancel` fires.
    fn watch(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError>;
}

/// Yields data sources only discoverable at runtime.
#[async_trait]
pub trait DataSourceLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<Arc<dyn DataSource>>, CoreError>;
}

/// Loader used when nothing is discovered dynamically.
pub struct NoopLoader;

#[async_trait]
impl DataSourceLoader for NoopLoader {
    async fn load(&self) -> Result<Vec<Arc<dyn DataSource>>, CoreError> {
        Ok(Vec::new())
    }
}

// ── Assembly ─────────────────────────────────────────────────────────

/// Builds the statically configured sources and the dynamic loader.
pub fn build_data_sources(
    config: &CollectorConfig,
) -> Result<(Vec<Arc<dyn DataSource>>, Arc<dyn DataSourceLoader>), CoreError> {
    let mut sources: Vec<Arc<dyn DataSource>> = Vec::new();

    for plugin in &config.hardware_plugins {
        sources.push(Arc::new(HwPluginDataSource::new(
            &plugin.name,
            plugin.api_root.clone(),
            &plugin.transport,
            config.cloud_id,
            config.global_cloud_id,
        )?));
    }

    let Some(hub_config) = &config.hub else {
        return Ok((sources, Arc::new(NoopLoader)));
    };

    let hub = HubClient::new(
        hub_config.url.clone(),
        hub_config.namespace.clone(),
        &hub_config.transport,
    )?;

    sources.push(Arc::new(ClusterDataSource::new(
        hub.clone(),
        config.cloud_id,
        config.watch.clusters,
    )));
    if config.watch.resource_pools {
        sources.push(Arc::new(ResourcePoolDataSource::new(
            hub.clone(),
            config.cloud_id,
            config.global_cloud_id,
        )));
    }
    if config.watch.locations {
        sources.push(Arc::new(LocationDataSource::new(hub.clone(), config.cloud_id)));
    }
    if config.watch.ocloud_sites {
        sources.push(Arc::new(OCloudSiteDataSource::new(hub.clone(), config.cloud_id)));
    }

    let loader: Arc<dyn DataSourceLoader> = if config.discover_hardware_plugins {
        Arc::new(HwPluginLoader::new(
            hub,
            config.plugin_transport.clone(),
            config.cloud_id,
            config.global_cloud_id,
        ))
    } else {
        Arc::new(NoopLoader)
    };

    Ok((sources, loader))
}
