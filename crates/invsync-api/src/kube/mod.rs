// Hub list/watch API: typed resources, list envelopes, and watch streams.

pub mod client;
pub mod resources;
pub mod types;

pub use client::HubClient;
pub use resources::{
    CivicAddressElement, ClientConfig, GeoLocation, HardwarePlugin, HardwarePluginSpec, Location,
    LocationSpec, ManagedCluster, ManagedClusterSpec, ManagedClusterStatus, OCloudSite,
    OCloudSiteSpec, ResourcePool, ResourcePoolSpec,
};
pub use types::{
    Bookmark, Condition, ListMeta, Listing, ObjectList, ObjectMeta, Resource, Status, WatchEvent,
    find_condition,
};
