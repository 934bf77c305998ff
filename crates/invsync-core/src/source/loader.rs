// Discovers hardware plugins registered on the hub as `HardwarePlugin`
// resources and builds a data source for each.

use std::sync::Arc;

use async_trait::async_trait;
use invsync_api::kube::{HardwarePlugin, HubClient};
use invsync_api::transport::TransportConfig;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{DataSource, DataSourceLoader, HwPluginDataSource};
use crate::error::CoreError;

pub struct HwPluginLoader {
    hub: HubClient,
    transport: TransportConfig,
    cloud_id: Uuid,
    global_cloud_id: Uuid,
}

impl HwPluginLoader {
    pub fn new(
        hub: HubClient,
        transport: TransportConfig,
        cloud_id: Uuid,
        global_cloud_id: Uuid,
    ) -> Self {
        Self {
            hub,
            transport,
            cloud_id,
            global_cloud_id,
        }
    }
}

#[async_trait]
impl DataSourceLoader for HwPluginLoader {
    async fn load(&self) -> Result<Vec<Arc<dyn DataSource>>, CoreError> {
        let listing = self.hub.list::<HardwarePlugin>().await?;

        let mut sources: Vec<Arc<dyn DataSource>> = Vec::with_capacity(listing.items.len());
        for plugin in &listing.items {
            let name = &plugin.metadata.name;
            let api_root = match Url::parse(&plugin.spec.api_root) {
                Ok(url) => url,
                Err(e) => {
                    warn!(plugin = %name, api_root = %plugin.spec.api_root, error = %e, "skipping plugin with invalid apiRoot");
                    continue;
                }
            };

            match HwPluginDataSource::new(
                name,
                api_root,
                &self.transport,
                self.cloud_id,
                self.global_cloud_id,
            ) {
                Ok(source) => sources.push(Arc::new(source)),
                Err(e) => warn!(plugin = %name, error = %e, "cannot build plugin client"),
            }
        }

        debug!(count = sources.len(), "loaded hardware plugin data sources");
        Ok(sources)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn registered_plugins_become_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/apis/clcm.openshift.io/v1alpha1/namespaces/oran-o2ims/hardwareplugins",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"resourceVersion": "5"},
                "items": [
                    {"metadata": {"name": "metal3"}, "spec": {"apiRoot": "https://metal3.example"}},
                    {"metadata": {"name": "broken"}, "spec": {"apiRoot": "not a url"}}
                ]
            })))
            .mount(&server)
            .await;

        let hub = HubClient::new(
            server.uri().parse().unwrap(),
            Some("oran-o2ims".into()),
            &TransportConfig::default(),
        )
        .unwrap();
        let loader = HwPluginLoader::new(
            hub,
            TransportConfig::default(),
            Uuid::from_u128(1),
            Uuid::from_u128(2),
        );

        let sources = loader.load().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "HardwarePlugin(name=metal3)");
    }
}
