// Typed hub resources watched or listed by the collectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{Condition, ObjectMeta, Resource};

/// API group of the inventory custom resources.
pub const INVENTORY_GROUP: &str = "ocloud.openshift.io";
/// API group of the hardware-plugin registration resources.
pub const HARDWARE_GROUP: &str = "clcm.openshift.io";

macro_rules! impl_resource {
    ($ty:ty, $group:expr, $version:expr, $plural:expr, $kind:expr, $namespaced:expr) => {
        impl Resource for $ty {
            const GROUP: &'static str = $group;
            const VERSION: &'static str = $version;
            const PLURAL: &'static str = $plural;
            const KIND: &'static str = $kind;
            const NAMESPACED: bool = $namespaced;

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }
        }
    };
}

// ── ManagedCluster ───────────────────────────────────────────────────

/// A cluster registered with the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedCluster {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ManagedClusterSpec,
    #[serde(default)]
    pub status: ManagedClusterStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    #[serde(default)]
    pub managed_cluster_client_configs: Vec<ClientConfig>,
    #[serde(default)]
    pub hub_accepts_client: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Resource quantities as serialized by the hub (`"16"`, `"64Gi"`).
    #[serde(default)]
    pub allocatable: BTreeMap<String, String>,
    #[serde(default)]
    pub capacity: BTreeMap<String, String>,
}

impl_resource!(
    ManagedCluster,
    "cluster.open-cluster-management.io",
    "v1",
    "managedclusters",
    "ManagedCluster",
    false
);

// ── ResourcePool ─────────────────────────────────────────────────────

/// A resource pool declared on the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ResourcePoolSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePoolSpec {
    #[serde(default)]
    pub resource_pool_id: String,
    #[serde(default, rename = "oCloudSiteId")]
    pub o_cloud_site_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, String>>,
}

impl_resource!(
    ResourcePool,
    INVENTORY_GROUP,
    "v1alpha1",
    "resourcepools",
    "ResourcePool",
    true
);

// ── Location ─────────────────────────────────────────────────────────

/// A physical location declared on the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: LocationSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSpec {
    #[serde(default)]
    pub global_location_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<GeoLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub civic_address: Vec<CivicAddressElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, String>>,
}

/// Coordinates as decimal strings, the way the CRD stores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: String,
    pub longitude: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CivicAddressElement {
    pub ca_type: i32,
    pub ca_value: String,
}

impl_resource!(
    Location,
    INVENTORY_GROUP,
    "v1alpha1",
    "locations",
    "Location",
    true
);

// ── OCloudSite ───────────────────────────────────────────────────────

/// A cloud site declared on the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OCloudSite {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: OCloudSiteSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OCloudSiteSpec {
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub global_location_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, String>>,
}

impl_resource!(
    OCloudSite,
    INVENTORY_GROUP,
    "v1alpha1",
    "ocloudsites",
    "OCloudSite",
    true
);

// ── HardwarePlugin ───────────────────────────────────────────────────

/// Registration of a hardware-management plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwarePlugin {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: HardwarePluginSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwarePluginSpec {
    /// Root URL of the plugin's REST API.
    #[serde(default)]
    pub api_root: String,
}

impl_resource!(
    HardwarePlugin,
    HARDWARE_GROUP,
    "v1alpha1",
    "hardwareplugins",
    "HardwarePlugin",
    true
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_prefix_includes_group() {
        assert_eq!(
            ManagedCluster::api_prefix(),
            "apis/cluster.open-cluster-management.io/v1"
        );
        assert_eq!(Location::api_prefix(), "apis/ocloud.openshift.io/v1alpha1");
    }

    #[test]
    fn managed_cluster_decodes_hub_payload() {
        let cluster: ManagedCluster = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "spoke1", "labels": {"clusterID": "0b8a2a2e-4c1c-4a53-9a8b-0a9c4b1f1c11"}},
            "spec": {"managedClusterClientConfigs": [{"url": "https://api.spoke1:6443"}]},
            "status": {
                "conditions": [{"type": "ManagedClusterConditionAvailable", "status": "True"}],
                "allocatable": {"cpu": "16", "memory": "64Gi"}
            }
        }))
        .unwrap();
        assert_eq!(cluster.metadata.name, "spoke1");
        assert_eq!(
            cluster.spec.managed_cluster_client_configs[0].url,
            "https://api.spoke1:6443"
        );
        assert_eq!(cluster.status.allocatable["cpu"], "16");
    }

    #[test]
    fn location_spec_decodes_coordinates() {
        let location: Location = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "ottawa", "namespace": "inventory"},
            "spec": {
                "globalLocationId": "CA-OTT-01",
                "name": "Ottawa",
                "description": "Ottawa DC",
                "coordinate": {"latitude": "45.42", "longitude": "-75.69"},
                "civicAddress": [{"caType": 1, "caValue": "ON"}]
            }
        }))
        .unwrap();
        let coordinate = location.spec.coordinate.unwrap();
        assert_eq!(coordinate.latitude, "45.42");
        assert!(coordinate.altitude.is_none());
        assert_eq!(location.spec.civic_address[0].ca_type, 1);
    }
}
