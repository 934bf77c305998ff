// ── Change notifications ──
//
// Persisted change events are turned into inventory change notifications
// and handed to a `NotificationHandler`. Delivery is fire-and-forget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{DataChangeEvent, EntityKind};

const API_BASE: &str = "/o2ims-infrastructureInventory/v1";

/// Default capacity of the broadcast fan-out.
pub const NOTIFICATION_CHANNEL_SIZE: usize = 256;

// ── Payload ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    pub sequence_id: i64,
    pub payload: InventoryChangeNotification,
}

/// Inventory change as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChangeNotification {
    /// 0 = create, 1 = modify, 2 = delete.
    pub notification_event_type: u8,
    pub notification_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_object_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_object_state: Option<Value>,
}

pub const EVENT_TYPE_CREATE: u8 = 0;
pub const EVENT_TYPE_MODIFY: u8 = 1;
pub const EVENT_TYPE_DELETE: u8 = 2;

impl From<&DataChangeEvent> for Notification {
    fn from(event: &DataChangeEvent) -> Self {
        let event_type = match (&event.before_state, &event.after_state) {
            (None, _) => EVENT_TYPE_CREATE,
            (Some(_), None) => EVENT_TYPE_DELETE,
            (Some(_), Some(_)) => EVENT_TYPE_MODIFY,
        };

        Self {
            notification_id: event.data_change_id,
            sequence_id: event.sequence_id,
            payload: InventoryChangeNotification {
                notification_event_type: event_type,
                notification_id: event.data_change_id,
                object_ref: object_ref(event.object_type, event.object_id, event.parent_id),
                prior_object_state: event.before_state.clone(),
                post_object_state: event.after_state.clone(),
            },
        }
    }
}

fn object_ref(kind: EntityKind, id: Uuid, parent_id: Option<Uuid>) -> Option<String> {
    match kind {
        EntityKind::ResourceType => Some(format!("{API_BASE}/resourceTypes/{id}")),
        EntityKind::ResourcePool => Some(format!("{API_BASE}/resourcePools/{id}")),
        EntityKind::Resource => {
            parent_id.map(|pool| format!("{API_BASE}/resourcePools/{pool}/resources/{id}"))
        }
        EntityKind::DeploymentManager => Some(format!("{API_BASE}/deploymentManagers/{id}")),
        EntityKind::Location | EntityKind::OCloudSite => None,
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Receives every change the collector persists.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Logs each notification.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationHandler for LogNotifier {
    async fn notify(&self, notification: Notification) {
        info!(
            sequence_id = notification.sequence_id,
            event_type = notification.payload.notification_event_type,
            object_ref = notification.payload.object_ref.as_deref().unwrap_or("-"),
            "inventory change"
        );
    }
}

/// Fans notifications out to any number of subscribers.
///
/// Slow subscribers lag and miss notifications rather than blocking the
/// collector.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Subscription as a `Stream`; lag shows up as `Err` items.
    pub fn stream(&self) -> BroadcastStream<Notification> {
        BroadcastStream::new(self.tx.subscribe())
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(NOTIFICATION_CHANNEL_SIZE)
    }
}

#[async_trait]
impl NotificationHandler for BroadcastNotifier {
    async fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("no notification subscribers");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn event(before: Option<Value>, after: Option<Value>) -> DataChangeEvent {
        DataChangeEvent {
            data_change_id: Uuid::from_u128(1),
            sequence_id: 7,
            object_type: EntityKind::Resource,
            object_id: Uuid::from_u128(2),
            parent_id: Some(Uuid::from_u128(3)),
            before_state: before,
            after_state: after,
            created_at: None,
        }
    }

    #[test]
    fn event_type_follows_present_states() {
        let state = json!({"name": "x"});
        let create = Notification::from(&event(None, Some(state.clone())));
        let modify = Notification::from(&event(Some(state.clone()), Some(state.clone())));
        let delete = Notification::from(&event(Some(state), None));

        assert_eq!(create.payload.notification_event_type, EVENT_TYPE_CREATE);
        assert_eq!(modify.payload.notification_event_type, EVENT_TYPE_MODIFY);
        assert_eq!(delete.payload.notification_event_type, EVENT_TYPE_DELETE);
        assert_eq!(create.sequence_id, 7);
    }

    #[test]
    fn resource_ref_nests_under_its_pool() {
        let n = Notification::from(&event(None, Some(json!({}))));
        assert_eq!(
            n.payload.object_ref.as_deref(),
            Some(
                "/o2ims-infrastructureInventory/v1/resourcePools/00000000-0000-0000-0000-000000000003/resources/00000000-0000-0000-0000-000000000002"
            )
        );
    }

    #[test]
    fn locations_have_no_object_ref() {
        let mut e = event(None, Some(json!({})));
        e.object_type = EntityKind::Location;
        assert!(Notification::from(&e).payload.object_ref.is_none());

        e.object_type = EntityKind::DeploymentManager;
        assert!(
            Notification::from(&e)
                .payload
                .object_ref
                .unwrap()
                .ends_with("/deploymentManagers/00000000-0000-0000-0000-000000000002")
        );
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let notifier = BroadcastNotifier::new(4);
        let mut first = notifier.subscribe();
        let mut second = notifier.stream();

        notifier
            .notify(Notification::from(&event(None, Some(json!({})))))
            .await;

        assert_eq!(first.recv().await.unwrap().sequence_id, 7);
        assert_eq!(second.next().await.unwrap().unwrap().sequence_id, 7);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_not_an_error() {
        BroadcastNotifier::default()
            .notify(Notification::from(&event(None, None)))
            .await;
    }
}
