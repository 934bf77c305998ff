#![allow(clippy::unwrap_used)]
// Integration tests for the Collector poll cycle against a wiremock
// hardware plugin.

use std::sync::Arc;
use std::time::Duration;

use invsync_api::transport::TransportConfig;
use invsync_core::notifier::BroadcastNotifier;
use invsync_core::source::HwPluginDataSource;
use invsync_core::{Collector, DataSource, Database, EntityKind, Resource, ResourcePool, ResourceType};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLOUD: Uuid = Uuid::from_u128(0x6575154a_72fc_4ed8_9a87_a81885ab38bb);
const GLOBAL_CLOUD: Uuid = Uuid::from_u128(0x1);
const HOST_A: &str = "5e3b1f4c-3f8c-4d0a-9d6a-2f6a8b7c9d01";
const HOST_B: &str = "7a9d2c11-8b4e-4f3a-a6c2-1d0e9f8b7a62";

// ── Helpers ──────────────────────────────────────────────────────────

fn host(resource_id: &str, model: &str) -> serde_json::Value {
    json!({
        "resourceId": resource_id,
        "resourcePoolId": "pool-a",
        "description": format!("host {resource_id}"),
        "vendor": "Dell",
        "model": model,
        "memory": 32768,
        "processors": [],
        "adminState": "UNLOCKED",
        "operationalState": "ENABLED",
        "usageState": "IDLE",
        "hwProfile": "small"
    })
}

async fn mount_inventory(server: &MockServer, resources: serde_json::Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/hardware-manager/inventory/v1/resourcePools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"resourcePoolId": "pool-a", "name": "pool-a", "description": "Pool A", "siteId": "site-1"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hardware-manager/inventory/v1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resources))
        .mount(server)
        .await;
}

fn plugin(server: &MockServer) -> Arc<dyn DataSource> {
    named_plugin("metal3", server)
}

fn named_plugin(name: &str, server: &MockServer) -> Arc<dyn DataSource> {
    Arc::new(
        HwPluginDataSource::new(
            name,
            server.uri().parse().unwrap(),
            &TransportConfig::default(),
            CLOUD,
            GLOBAL_CLOUD,
        )
        .unwrap(),
    )
}

fn collector(db: &Database, source: Arc<dyn DataSource>) -> Collector {
    Collector::with_static_sources(
        db.clone(),
        Arc::new(BroadcastNotifier::default()),
        vec![source],
        Duration::from_secs(600),
    )
}

fn event_count(db: &Database) -> usize {
    db.change_events_after(0, 1000).unwrap().len()
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn identical_polls_produce_no_new_change_events() {
    let server = MockServer::start().await;
    mount_inventory(&server, json!([host(HOST_A, "R740"), host(HOST_B, "R740")])).await;

    let db = Database::open_in_memory().unwrap();
    let source = plugin(&server);
    let mut collector = collector(&db, Arc::clone(&source));
    let cancel = CancellationToken::new();
    collector.start(&cancel).await.unwrap();

    collector.execute(&cancel).await;
    // one pool, one shared type, two resources
    assert_eq!(event_count(&db), 4);
    assert_eq!(source.generation(), 1);

    collector.execute(&cancel).await;
    assert_eq!(event_count(&db), 4);
    assert_eq!(source.generation(), 2);

    let record = db.data_source_by_name("HardwarePlugin(name=metal3)").unwrap().unwrap();
    assert_eq!(record.generation_id, 2);

    let resource: Resource = db.find(Uuid::parse_str(HOST_A).unwrap()).unwrap().unwrap();
    assert_eq!(resource.generation_id, 2);
}

#[tokio::test]
async fn vanished_objects_are_purged_after_a_poll() {
    let server = MockServer::start().await;
    mount_inventory(&server, json!([host(HOST_A, "R740"), host(HOST_B, "R650")])).await;

    let db = Database::open_in_memory().unwrap();
    let mut collector = collector(&db, plugin(&server));
    let cancel = CancellationToken::new();
    collector.start(&cancel).await.unwrap();
    collector.execute(&cancel).await;
    let before = db.change_events_after(0, 1000).unwrap();
    let last = before.last().unwrap().sequence_id;

    mount_inventory(&server, json!([host(HOST_A, "R740")])).await;
    collector.execute(&cancel).await;

    assert!(db.find::<Resource>(Uuid::parse_str(HOST_B).unwrap()).unwrap().is_none());
    let deletions = db.change_events_after(last, 1000).unwrap();
    let kinds: Vec<EntityKind> = deletions.iter().map(|e| e.object_type).collect();
    assert_eq!(kinds, vec![EntityKind::Resource, EntityKind::ResourceType]);
    assert!(deletions.iter().all(|e| e.after_state.is_none()));
}

#[tokio::test]
async fn failed_fetch_keeps_previous_state() {
    let server = MockServer::start().await;
    mount_inventory(&server, json!([host(HOST_A, "R740")])).await;

    let db = Database::open_in_memory().unwrap();
    let mut collector = collector(&db, plugin(&server));
    let cancel = CancellationToken::new();
    collector.start(&cancel).await.unwrap();
    collector.execute(&cancel).await;

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    collector.execute(&cancel).await;

    let pools: Vec<ResourcePool> = db
        .find_not_in(
            db.data_source_by_name("HardwarePlugin(name=metal3)")
                .unwrap()
                .unwrap()
                .data_source_id,
            &[],
        )
        .unwrap();
    assert_eq!(pools.len(), 1);
    assert!(db.find::<Resource>(Uuid::parse_str(HOST_A).unwrap()).unwrap().is_some());
}

#[tokio::test]
async fn failing_plugin_does_not_block_others_in_the_same_cycle() {
    let broken_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken_server)
        .await;
    let healthy_server = MockServer::start().await;
    mount_inventory(&healthy_server, json!([host(HOST_A, "R740")])).await;

    let db = Database::open_in_memory().unwrap();
    let broken = named_plugin("broken", &broken_server);
    let healthy = named_plugin("metal3", &healthy_server);
    let mut collector = Collector::with_static_sources(
        db.clone(),
        Arc::new(BroadcastNotifier::default()),
        vec![Arc::clone(&broken), Arc::clone(&healthy)],
        Duration::from_secs(600),
    );
    let cancel = CancellationToken::new();
    collector.start(&cancel).await.unwrap();

    collector.execute(&cancel).await;

    // pool, type and resource of the healthy plugin only
    assert_eq!(event_count(&db), 3);
    assert_eq!(healthy.generation(), 1);
    let record = db.data_source_by_name("HardwarePlugin(name=metal3)").unwrap().unwrap();
    assert_eq!(record.generation_id, 1);
    let resource: Resource = db.find(Uuid::parse_str(HOST_A).unwrap()).unwrap().unwrap();
    assert_eq!(resource.data_source_id, healthy.id());

    let pools: Vec<ResourcePool> = db.find_not_in(broken.id(), &[]).unwrap();
    assert!(pools.is_empty());
}

#[tokio::test]
async fn identity_and_generation_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("inventory.db");

    let server = MockServer::start().await;
    mount_inventory(&server, json!([host(HOST_A, "R740")])).await;
    let cancel = CancellationToken::new();

    let first_id = {
        let db = Database::open(&db_path).unwrap();
        let source = plugin(&server);
        let mut collector = collector(&db, Arc::clone(&source));
        collector.start(&cancel).await.unwrap();
        collector.execute(&cancel).await;
        source.id()
    };

    let db = Database::open(&db_path).unwrap();
    let events_before = event_count(&db);
    let source = plugin(&server);
    let mut collector = collector(&db, Arc::clone(&source));
    collector.start(&cancel).await.unwrap();
    assert_eq!(source.id(), first_id);
    assert_eq!(source.generation(), 1);

    collector.execute(&cancel).await;
    assert_eq!(source.generation(), 2);
    assert_eq!(event_count(&db), events_before);

    let types: Vec<ResourceType> = db.find_not_in(first_id, &[]).unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name, "Dell/R740");
}

#[tokio::test]
async fn notifications_follow_persisted_changes() {
    let server = MockServer::start().await;
    mount_inventory(&server, json!([host(HOST_A, "R740")])).await;

    let db = Database::open_in_memory().unwrap();
    let notifier = BroadcastNotifier::new(16);
    let mut rx = notifier.subscribe();
    let mut collector = Collector::with_static_sources(
        db.clone(),
        Arc::new(notifier),
        vec![plugin(&server)],
        Duration::from_secs(600),
    );
    let cancel = CancellationToken::new();
    collector.start(&cancel).await.unwrap();
    collector.execute(&cancel).await;

    let mut sequence = Vec::new();
    while let Ok(n) = rx.try_recv() {
        sequence.push(n.sequence_id);
    }
    let persisted: Vec<i64> = db
        .change_events_after(0, 100)
        .unwrap()
        .iter()
        .map(|e| e.sequence_id)
        .collect();
    assert_eq!(sequence, persisted);
}
