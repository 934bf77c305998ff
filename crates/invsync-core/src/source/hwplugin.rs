// ── Hardware-plugin data source ──
//
// Polls one hardware-management plugin for its resource pools and
// resources. Identifiers are derived from plugin-local names so the same
// hardware maps to the same rows across restarts.

use std::sync::Arc;

use async_trait::async_trait;
use invsync_api::hwplugin::{InventoryClient, ResourceInfo, ResourcePoolInfo};
use invsync_api::transport::TransportConfig;
use serde_json::{Value, json};
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use super::{DataSource, ResourceDataSource, SourceState};
use crate::error::CoreError;
use crate::model::ids::{
    OCLOUD_SITE_NAMESPACE, RESOURCE_POOL_NAMESPACE, RESOURCE_TYPE_NAMESPACE, make_uuid_from_names,
};
use crate::model::{
    Extensions, Resource, ResourceClass, ResourceKind, ResourcePool, ResourceType,
};

pub struct HwPluginDataSource {
    name: String,
    plugin_name: String,
    client: InventoryClient,
    cloud_id: Uuid,
    global_cloud_id: Uuid,
    state: Arc<SourceState>,
}

impl HwPluginDataSource {
    pub fn new(
        plugin_name: &str,
        api_root: Url,
        transport: &TransportConfig,
        cloud_id: Uuid,
        global_cloud_id: Uuid,
    ) -> Result<Self, CoreError> {
        let client = InventoryClient::new(api_root, transport)?;
        Ok(Self::with_client(
            plugin_name,
            client,
            cloud_id,
            global_cloud_id,
        ))
    }

    pub fn with_client(
        plugin_name: &str,
        client: InventoryClient,
        cloud_id: Uuid,
        global_cloud_id: Uuid,
    ) -> Self {
        Self {
            name: format!("HardwarePlugin(name={plugin_name})"),
            plugin_name: plugin_name.to_owned(),
            client,
            cloud_id,
            global_cloud_id,
            state: SourceState::new(),
        }
    }

    fn pool_id(&self, resource_pool_id: &str) -> Uuid {
        make_uuid_from_names(
            RESOURCE_POOL_NAMESPACE,
            self.cloud_id,
            &[&self.plugin_name, resource_pool_id],
        )
    }

    fn resource_type_id(&self, vendor: &str, model: &str) -> Uuid {
        let type_name = format!("{vendor}/{model}");
        make_uuid_from_names(
            RESOURCE_TYPE_NAMESPACE,
            self.cloud_id,
            &[&self.plugin_name, &type_name],
        )
    }

    fn convert_pool(&self, pool: &ResourcePoolInfo) -> ResourcePool {
        let o_cloud_site_id = pool
            .site_id
            .as_deref()
            .filter(|site| !site.is_empty())
            .map(|site| make_uuid_from_names(OCLOUD_SITE_NAMESPACE, self.cloud_id, &[site]));

        ResourcePool {
            resource_pool_id: self.pool_id(&pool.resource_pool_id),
            global_location_id: self.global_cloud_id,
            name: pool.name.clone(),
            description: pool.description.clone(),
            o_cloud_id: self.cloud_id,
            location: pool.site_id.clone(),
            o_cloud_site_id,
            extensions: None,
            data_source_id: self.state.id(),
            generation_id: self.state.generation(),
            external_id: format!("{}/{}", self.plugin_name, pool.name),
            created_at: None,
        }
    }

    fn convert_resource(&self, info: &ResourceInfo) -> Result<Resource, CoreError> {
        let resource_id = Uuid::parse_str(&info.resource_id).map_err(|e| {
            CoreError::conversion(
                "Resource",
                &info.resource_id,
                format!("invalid resource id: {e}"),
            )
        })?;

        Ok(Resource {
            resource_id,
            resource_type_id: self.resource_type_id(&info.vendor, &info.model),
            resource_pool_id: self.pool_id(&info.resource_pool_id),
            global_asset_id: info.global_asset_id.clone(),
            description: info.description.clone(),
            extensions: Some(resource_extensions(info)),
            groups: info.groups.clone(),
            tags: info.tags.clone(),
            data_source_id: self.state.id(),
            generation_id: self.state.generation(),
            external_id: format!("{}/{}", self.plugin_name, info.resource_id),
            created_at: None,
        })
    }
}

fn resource_extensions(info: &ResourceInfo) -> Extensions {
    let mut ext = Extensions::new();
    ext.insert("model".into(), json!(info.model));
    ext.insert("vendor".into(), json!(info.vendor));
    ext.insert("memory".into(), json!(format!("{} MiB", info.memory)));
    ext.insert("processors".into(), json!(info.processors));
    ext.insert("adminState".into(), json!(info.admin_state));
    ext.insert("operationalState".into(), json!(info.operational_state));
    ext.insert("usageState".into(), json!(info.usage_state));
    ext.insert("hwProfile".into(), json!(info.hw_profile));

    if let Some(power_state) = &info.power_state {
        ext.insert("powerState".into(), json!(power_state));
    }
    if let Some(labels) = &info.labels {
        ext.insert("labels".into(), json!(labels));
    }
    if let Some(allocated) = info.allocated {
        ext.insert("allocated".into(), json!(allocated));
    }
    if let Some(nics) = &info.nics {
        ext.insert("nics".into(), Value::Array(nics.clone()));
    }
    if let Some(storage) = &info.storage {
        ext.insert("storage".into(), Value::Array(storage.clone()));
    }
    ext
}

fn extension_str<'a>(resource: &'a Resource, key: &str) -> Option<&'a str> {
    resource.extensions.as_ref()?.get(key)?.as_str()
}

impl DataSource for HwPluginDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn as_resource_source(&self) -> Option<&dyn ResourceDataSource> {
        Some(self)
    }
}

#[async_trait]
impl ResourceDataSource for HwPluginDataSource {
    async fn resource_pools(&self) -> Result<Vec<ResourcePool>, CoreError> {
        let pools = self.client.resource_pools().await?;
        debug!(source = %self.name, count = pools.len(), "fetched resource pools");
        Ok(pools.iter().map(|pool| self.convert_pool(pool)).collect())
    }

    async fn resources(&self, _pools: &[ResourcePool]) -> Result<Vec<Resource>, CoreError> {
        let infos = self.client.resources().await?;
        debug!(source = %self.name, count = infos.len(), "fetched resources");

        let mut resources = Vec::with_capacity(infos.len());
        for info in &infos {
            match self.convert_resource(info) {
                Ok(resource) => resources.push(resource),
                Err(e) => error!(source = %self.name, error = %e, "skipping resource"),
            }
        }
        Ok(resources)
    }

    fn classify(&self, resource: &Resource) -> Result<ResourceType, CoreError> {
        let missing = |key: &str| {
            CoreError::conversion(
                "Resource",
                resource.resource_id.to_string(),
                format!("missing '{key}' extension"),
            )
        };
        let vendor = extension_str(resource, "vendor").ok_or_else(|| missing("vendor"))?;
        let model = extension_str(resource, "model").ok_or_else(|| missing("model"))?;
        let name = format!("{vendor}/{model}");

        Ok(ResourceType {
            resource_type_id: self.resource_type_id(vendor, model),
            description: name.clone(),
            name,
            vendor: vendor.to_owned(),
            model: model.to_owned(),
            version: String::new(),
            resource_kind: ResourceKind::Physical,
            resource_class: ResourceClass::Compute,
            extensions: None,
            data_source_id: self.state.id(),
            generation_id: self.state.generation(),
            created_at: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const CLOUD: Uuid = Uuid::from_u128(0x10);
    const GLOBAL_CLOUD: Uuid = Uuid::from_u128(0x20);
    const RESOURCE_ID: &str = "5e3b1f4c-3f8c-4d0a-9d6a-2f6a8b7c9d01";

    fn plugin(api_root: &str) -> HwPluginDataSource {
        HwPluginDataSource::new(
            "metal3",
            api_root.parse().unwrap(),
            &TransportConfig::default(),
            CLOUD,
            GLOBAL_CLOUD,
        )
        .unwrap()
    }

    async fn source(server: &MockServer) -> HwPluginDataSource {
        plugin(&server.uri())
    }

    fn resource_json(resource_id: &str) -> serde_json::Value {
        json!({
            "resourceId": resource_id,
            "resourcePoolId": "pool-a",
            "description": "worker 0",
            "vendor": "Dell",
            "model": "R740",
            "memory": 65536,
            "processors": [{"architecture": "x86_64", "cores": 32}],
            "adminState": "UNLOCKED",
            "operationalState": "ENABLED",
            "usageState": "ACTIVE",
            "powerState": "ON",
            "hwProfile": "profile-a",
            "tags": ["rack-3"]
        })
    }

    #[test]
    fn name_embeds_plugin_name() {
        let source = plugin("http://localhost");
        assert_eq!(source.name(), "HardwarePlugin(name=metal3)");
        assert!(source.as_resource_source().is_some());
        assert!(source.as_watchable().is_none());
    }

    #[tokio::test]
    async fn pools_get_deterministic_ids_and_site_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hardware-manager/inventory/v1/resourcePools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"resourcePoolId": "pool-a", "name": "pool-a", "description": "A", "siteId": "site-1"},
                {"resourcePoolId": "pool-b", "name": "pool-b", "description": "B"}
            ])))
            .mount(&server)
            .await;

        let source = source(&server).await;
        let pools = source.resource_pools().await.unwrap();

        assert_eq!(pools.len(), 2);
        assert_eq!(
            pools[0].resource_pool_id,
            make_uuid_from_names(RESOURCE_POOL_NAMESPACE, CLOUD, &["metal3", "pool-a"])
        );
        assert_eq!(
            pools[0].o_cloud_site_id,
            Some(make_uuid_from_names(OCLOUD_SITE_NAMESPACE, CLOUD, &["site-1"]))
        );
        assert_eq!(pools[0].global_location_id, GLOBAL_CLOUD);
        assert_eq!(pools[0].external_id, "metal3/pool-a");
        assert!(pools[1].o_cloud_site_id.is_none());

        let again = source.resource_pools().await.unwrap();
        assert_eq!(again[0].resource_pool_id, pools[0].resource_pool_id);
    }

    #[tokio::test]
    async fn resources_skip_invalid_ids_and_classify() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hardware-manager/inventory/v1/resources"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([resource_json(RESOURCE_ID), resource_json("bogus")])),
            )
            .mount(&server)
            .await;

        let source = source(&server).await;
        let resources = source.resources(&[]).await.unwrap();
        assert_eq!(resources.len(), 1);

        let resource = &resources[0];
        assert_eq!(resource.resource_id, Uuid::parse_str(RESOURCE_ID).unwrap());
        assert_eq!(resource.external_id, format!("metal3/{RESOURCE_ID}"));
        let ext = resource.extensions.as_ref().unwrap();
        assert_eq!(ext["memory"], json!("65536 MiB"));
        assert_eq!(ext["powerState"], json!("ON"));
        assert!(!ext.contains_key("labels"));

        let resource_type = source.classify(resource).unwrap();
        assert_eq!(resource_type.name, "Dell/R740");
        assert_eq!(resource_type.resource_kind, ResourceKind::Physical);
        assert_eq!(resource_type.resource_class, ResourceClass::Compute);
        assert_eq!(resource_type.resource_type_id, resource.resource_type_id);
    }

    #[tokio::test]
    async fn empty_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hardware-manager/inventory/v1/resourcePools"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let source = source(&server).await;
        let err = source.resource_pools().await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn non_ok_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hardware-manager/inventory/v1/resources"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = source(&server).await;
        let err = source.resources(&[]).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: Some(503), .. }));
    }

    #[test]
    fn classify_requires_vendor_and_model() {
        let source = plugin("http://localhost");
        let err = source.classify(&Resource::default()).unwrap_err();
        assert!(matches!(err, CoreError::Conversion { .. }));
    }
}
