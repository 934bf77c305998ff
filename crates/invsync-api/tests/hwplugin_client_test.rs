#![allow(clippy::unwrap_used)]
// Integration tests for `InventoryClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use invsync_api::Error;
use invsync_api::hwplugin::InventoryClient;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, InventoryClient) {
    let server = MockServer::start().await;
    let api_root = Url::parse(&server.uri()).unwrap();
    let client = InventoryClient::with_client(reqwest::Client::new(), api_root);
    (server, client)
}

fn inventory_path(suffix: &str) -> String {
    format!("/hardware-manager/inventory/v1/{suffix}")
}

// ── Resource pools ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_resource_pools() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(inventory_path("resourcePools")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"resourcePoolId": "pool-a", "name": "pool-a", "description": "Pool A", "siteId": "site-1"},
            {"resourcePoolId": "pool-b", "name": "pool-b", "description": "Pool B"}
        ])))
        .mount(&server)
        .await;

    let pools = client.resource_pools().await.unwrap();
    assert_eq!(pools.len(), 2);
    assert_eq!(pools[0].site_id.as_deref(), Some("site-1"));
    assert!(pools[1].site_id.is_none());
}

#[tokio::test]
async fn test_non_200_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(inventory_path("resourcePools")))
        .respond_with(ResponseTemplate::new(503).set_body_string("plugin restarting"))
        .mount(&server)
        .await;

    let result = client.resource_pools().await;
    assert!(
        matches!(result, Err(Error::Api { status: 503, ref message }) if message == "plugin restarting"),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_empty_body_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(inventory_path("resources")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client.resources().await;
    assert!(
        matches!(result, Err(Error::EmptyResponse { .. })),
        "expected EmptyResponse, got: {result:?}"
    );
}

// ── Resources ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_resources() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(inventory_path("resources")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "resourceId": "5b3c1f3e-8f7a-4d57-9a59-1d2e3f4a5b6c",
            "resourcePoolId": "pool-a",
            "description": "worker-0",
            "vendor": "Dell",
            "model": "R740",
            "memory": 65536,
            "processors": [{"architecture": "x86_64", "cores": 32}],
            "adminState": "UNLOCKED",
            "operationalState": "ENABLED",
            "usageState": "ACTIVE",
            "powerState": "ON",
            "hwProfile": "profile-a",
            "tags": ["edge"],
            "allocated": false
        }])))
        .mount(&server)
        .await;

    let resources = client.resources().await.unwrap();
    assert_eq!(resources.len(), 1);
    let resource = &resources[0];
    assert_eq!(resource.vendor, "Dell");
    assert_eq!(resource.memory, 65536);
    assert_eq!(resource.processors[0].cores, Some(32));
    assert_eq!(resource.power_state.as_deref(), Some("ON"));
    assert_eq!(resource.allocated, Some(false));
    assert!(resource.labels.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(inventory_path("resources")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"oops\":"))
        .mount(&server)
        .await;

    let result = client.resources().await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}
