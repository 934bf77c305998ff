// Hardware-plugin inventory HTTP client
//
// One client per registered plugin. Every endpoint lives under
// `{apiRoot}/hardware-manager/inventory/v1`.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::types::{ResourceInfo, ResourcePoolInfo};
use crate::error::Error;
use crate::transport::{TransportConfig, error_from_response};

const INVENTORY_PREFIX: &str = "hardware-manager/inventory/v1";

/// HTTP client for a single plugin's inventory API.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    api_root: Url,
}

impl InventoryClient {
    /// Create an inventory client from a `TransportConfig`.
    pub fn new(api_root: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, api_root))
    }

    /// Create an inventory client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, api_root: Url) -> Self {
        Self { http, api_root }
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// `{apiRoot}/hardware-manager/inventory/v1/{path}`
    pub(crate) fn inventory_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.api_root.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{INVENTORY_PREFIX}/{path}"))?)
    }

    /// Every resource pool the plugin manages.
    pub async fn resource_pools(&self) -> Result<Vec<ResourcePoolInfo>, Error> {
        self.get_list("resourcePools").await
    }

    /// Every resource the plugin manages, across all pools.
    pub async fn resources(&self) -> Result<Vec<ResourceInfo>, Error> {
        self.get_list("resources").await
    }

    /// GET a JSON array. Anything but 200 with a body is an error.
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        let url = self.inventory_url(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url.clone()).send().await.map_err(Error::Transport)?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(error_from_response(resp).await);
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(Error::EmptyResponse {
                endpoint: url.path().to_owned(),
            });
        }

        serde_json::from_str(trimmed).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
