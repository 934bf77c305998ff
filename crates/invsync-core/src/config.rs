// ── Collector configuration ──
//
// Runtime settings consumed by the collector and the data-source builders.
// Core never reads files; the binary resolves these from invsync-config.

use std::time::Duration;

use invsync_api::transport::TransportConfig;
use url::Url;
use uuid::Uuid;

/// Default interval between full poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Everything the collector needs to assemble and drive its data sources.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Owning cloud; seeds every deterministic identifier.
    pub cloud_id: Uuid,
    /// Globally scoped cloud id, recorded as the location of plugin pools.
    pub global_cloud_id: Uuid,
    pub poll_interval: Duration,
    /// Cluster API hub. Without it no watcher or plugin discovery runs.
    pub hub: Option<HubConfig>,
    pub watch: WatchConfig,
    /// Statically configured hardware plugins.
    pub hardware_plugins: Vec<HardwarePluginConfig>,
    /// Discover further plugins from `HardwarePlugin` resources on the hub.
    pub discover_hardware_plugins: bool,
    /// Transport used for plugins discovered on the hub.
    pub plugin_transport: TransportConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            cloud_id: Uuid::nil(),
            global_cloud_id: Uuid::nil(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            hub: None,
            watch: WatchConfig::default(),
            hardware_plugins: Vec::new(),
            discover_hardware_plugins: false,
            plugin_transport: TransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub url: Url,
    /// Namespace holding the inventory resources; `None` means all.
    pub namespace: Option<String>,
    pub transport: TransportConfig,
}

/// Which hub resources are watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Watch managed clusters; when off they are polled instead.
    pub clusters: bool,
    pub resource_pools: bool,
    pub locations: bool,
    pub ocloud_sites: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            clusters: true,
            resource_pools: true,
            locations: true,
            ocloud_sites: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HardwarePluginConfig {
    pub name: String,
    pub api_root: Url,
    pub transport: TransportConfig,
}
