// invsync-core: Collection and synchronization engine between backends and the inventory store.

pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod notifier;
pub mod reflector_store;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collector::Collector;
pub use config::{CollectorConfig, HardwarePluginConfig, HubConfig, WatchConfig};
pub use error::CoreError;
pub use event::{AsyncChangeEvent, AsyncEventType};
pub use notifier::{BroadcastNotifier, LogNotifier, Notification, NotificationHandler};
pub use reflector_store::{AsyncEventHandler, ReflectorStore};
pub use source::{
    DataSource, DataSourceLoader, DeploymentManagerDataSource, ResourceDataSource,
    WatchableDataSource,
};
pub use store::Database;

pub use model::{
    DataChangeEvent, DataSourceRecord, DeploymentManager, Entity, EntityKind, Location, Model,
    OCloudSite, Resource, ResourceClass, ResourceKind, ResourcePool, ResourceType,
};
