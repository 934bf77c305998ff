// Glue between a hub reflector and the collector's event channel: every
// watched object is converted into an entity and forwarded as an
// `AsyncChangeEvent`.

use std::sync::Arc;

use async_trait::async_trait;
use invsync_api::kube::{HubClient, Resource as HubResource};
use invsync_api::reflector::Reflector;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{SourceState, send_event};
use crate::error::CoreError;
use crate::event::{AsyncChangeEvent, AsyncEventType};
use crate::model::{Entity, EntityKind};
use crate::reflector_store::{AsyncEventHandler, ReflectorStore};

/// Inputs every hub-object conversion needs besides the object itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConvertContext {
    pub cloud_id: Uuid,
    pub global_cloud_id: Uuid,
    pub data_source_id: Uuid,
    pub generation_id: i64,
}

/// Converts a hub object. `Ok(None)` filters the object out.
pub(crate) type ConvertFn<K> =
    fn(&K, AsyncEventType, &ConvertContext) -> Result<Option<Entity>, CoreError>;

/// Forwards converted objects of one hub kind to the collector.
pub(crate) struct ForwardingHandler<K> {
    pub state: Arc<SourceState>,
    pub source_name: String,
    pub kind: EntityKind,
    pub cloud_id: Uuid,
    pub global_cloud_id: Uuid,
    pub convert: ConvertFn<K>,
}

impl<K> ForwardingHandler<K> {
    fn context(&self) -> ConvertContext {
        ConvertContext {
            cloud_id: self.cloud_id,
            global_cloud_id: self.global_cloud_id,
            data_source_id: self.state.id(),
            generation_id: self.state.generation(),
        }
    }
}

#[async_trait]
impl<K: HubResource> AsyncEventHandler<K> for ForwardingHandler<K> {
    async fn handle_async_event(
        &self,
        cancel: &CancellationToken,
        obj: K,
        event_type: AsyncEventType,
    ) -> Result<Option<Uuid>, CoreError> {
        let Some(entity) = (self.convert)(&obj, event_type, &self.context())? else {
            debug!(
                source = %self.source_name,
                name = %obj.metadata().name,
                "object filtered out"
            );
            return Ok(None);
        };

        let key = entity.id();
        let event = AsyncChangeEvent::single(self.state.id(), event_type, entity);
        send_event(&self.state, &self.source_name, cancel, event).await?;
        Ok(Some(key))
    }

    async fn handle_sync_complete(
        &self,
        cancel: &CancellationToken,
        keys: Vec<Uuid>,
    ) -> Result<(), CoreError> {
        let event = AsyncChangeEvent::sync_complete(self.state.id(), self.kind, keys);
        send_event(&self.state, &self.source_name, cancel, event).await
    }
}

/// Spawns a reflector for `K` and the receiver draining its store.
///
/// Both tasks stop when `cancel` fires; the receiver also stops if the
/// reflector gives up.
pub(crate) fn spawn_watch<K: HubResource>(
    reflector_name: &str,
    hub: HubClient,
    handler: ForwardingHandler<K>,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let store = Arc::new(ReflectorStore::<K>::new(format!("{reflector_name}-store")));
    let watch_cancel = cancel.child_token();

    let reflector = Reflector::<K>::new(reflector_name, hub);
    let reflector_store = Arc::clone(&store);
    let reflector_cancel = watch_cancel.clone();
    let reflector_task = tokio::spawn(async move {
        reflector
            .run(reflector_store.as_ref(), reflector_cancel.clone())
            .await;
        reflector_cancel.cancel();
    });

    let receiver_name = reflector_name.to_owned();
    let receiver_task = tokio::spawn(async move {
        store.receive(&watch_cancel, &handler).await;
        info!(reflector = %receiver_name, "watch receiver stopped");
    });

    vec![reflector_task, receiver_task]
}

/// String map from a hub spec as entity extensions.
pub(crate) fn string_extensions(
    map: Option<&std::collections::BTreeMap<String, String>>,
) -> Option<crate::model::Extensions> {
    map.map(|map| {
        map.iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect()
    })
}

/// `namespace/name` of a hub object, or just the name when cluster-scoped.
pub(crate) fn object_key<K: HubResource>(obj: &K) -> String {
    let meta = obj.metadata();
    match &meta.namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}/{}", meta.name),
        _ => meta.name.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use invsync_api::kube::ObjectMeta;
    use invsync_api::kube::OCloudSite as SiteCr;
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::OCloudSite;

    fn convert(
        obj: &SiteCr,
        _event_type: AsyncEventType,
        ctx: &ConvertContext,
    ) -> Result<Option<Entity>, CoreError> {
        if obj.spec.site_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(Entity::from(OCloudSite {
            o_cloud_site_id: Uuid::from_u128(obj.spec.site_id.parse().unwrap()),
            data_source_id: ctx.data_source_id,
            generation_id: ctx.generation_id,
            ..OCloudSite::default()
        })))
    }

    fn site(site_id: &str) -> SiteCr {
        let mut cr = SiteCr::default();
        cr.spec.site_id = site_id.into();
        cr
    }

    fn handler(state: Arc<SourceState>) -> ForwardingHandler<SiteCr> {
        ForwardingHandler {
            state,
            source_name: "OCloudSite".into(),
            kind: EntityKind::OCloudSite,
            cloud_id: Uuid::nil(),
            global_cloud_id: Uuid::nil(),
            convert,
        }
    }

    #[tokio::test]
    async fn converted_objects_are_forwarded_with_source_identity() {
        let state = SourceState::new();
        let (tx, mut rx) = mpsc::channel(4);
        state.init(Uuid::from_u128(9), 3, tx);
        let handler = handler(Arc::clone(&state));
        let cancel = CancellationToken::new();

        let key = handler
            .handle_async_event(&cancel, site("7"), AsyncEventType::Updated)
            .await
            .unwrap();
        assert_eq!(key, Some(Uuid::from_u128(7)));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data_source_id, Uuid::from_u128(9));
        assert_eq!(event.event_type, AsyncEventType::Updated);
        match event.object.unwrap() {
            Entity::OCloudSite(s) => assert_eq!(s.generation_id, 3),
            other => panic!("unexpected entity: {other:?}"),
        }
    }

    #[tokio::test]
    async fn filtered_objects_send_nothing() {
        let state = SourceState::new();
        let (tx, mut rx) = mpsc::channel(4);
        state.init(Uuid::from_u128(9), 0, tx);
        let handler = handler(state);

        let key = handler
            .handle_async_event(&CancellationToken::new(), site(""), AsyncEventType::Updated)
            .await
            .unwrap();
        assert!(key.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sync_complete_carries_kind_and_keys() {
        let state = SourceState::new();
        let (tx, mut rx) = mpsc::channel(4);
        state.init(Uuid::from_u128(9), 0, tx);
        let handler = handler(state);

        handler
            .handle_sync_complete(&CancellationToken::new(), vec![Uuid::from_u128(1)])
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, AsyncEventType::SyncComplete);
        assert_eq!(event.kind, EntityKind::OCloudSite);
        assert_eq!(event.keys, vec![Uuid::from_u128(1)]);
    }

    #[test]
    fn object_key_includes_namespace() {
        let mut cr = site("1");
        cr.metadata = ObjectMeta {
            name: "east".into(),
            namespace: Some("inventory".into()),
            ..ObjectMeta::default()
        };
        assert_eq!(object_key(&cr), "inventory/east");
        cr.metadata.namespace = None;
        assert_eq!(object_key(&cr), "east");
    }

    #[test]
    fn string_extensions_become_json_strings() {
        let map = BTreeMap::from([("rack".to_owned(), "r12".to_owned())]);
        let ext = string_extensions(Some(&map)).unwrap();
        assert_eq!(ext["rack"], serde_json::json!("r12"));
        assert!(string_extensions(None).is_none());
    }
}
