// Watches `ResourcePool` custom resources declared on the hub.

use std::sync::Arc;

use invsync_api::kube::{HubClient, ResourcePool as ResourcePoolCr};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::watch::{ConvertContext, ForwardingHandler, object_key, spawn_watch, string_extensions};
use super::{DataSource, SourceState, WatchableDataSource};
use crate::error::CoreError;
use crate::event::AsyncEventType;
use crate::model::ids::{OCLOUD_SITE_NAMESPACE, RESOURCE_POOL_NAMESPACE, make_uuid_from_names};
use crate::model::{Entity, EntityKind, ResourcePool};

pub const RESOURCE_POOL_SOURCE_NAME: &str = "ResourcePool";

pub struct ResourcePoolDataSource {
    hub: HubClient,
    cloud_id: Uuid,
    global_cloud_id: Uuid,
    state: Arc<SourceState>,
}

impl ResourcePoolDataSource {
    pub fn new(hub: HubClient, cloud_id: Uuid, global_cloud_id: Uuid) -> Self {
        Self {
            hub,
            cloud_id,
            global_cloud_id,
            state: SourceState::new(),
        }
    }
}

impl DataSource for ResourcePoolDataSource {
    fn name(&self) -> &str {
        RESOURCE_POOL_SOURCE_NAME
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
        Some(self)
    }
}

impl WatchableDataSource for ResourcePoolDataSource {
    fn watch(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let handler = ForwardingHandler {
            state: Arc::clone(&self.state),
            source_name: RESOURCE_POOL_SOURCE_NAME.to_owned(),
            kind: EntityKind::ResourcePool,
            cloud_id: self.cloud_id,
            global_cloud_id: self.global_cloud_id,
            convert: convert_resource_pool,
        };
        Ok(spawn_watch(
            "resource-pool-reflector",
            self.hub.clone(),
            handler,
            cancel,
        ))
    }
}

pub(crate) fn convert_resource_pool(
    cr: &ResourcePoolCr,
    _event_type: AsyncEventType,
    ctx: &ConvertContext,
) -> Result<Option<Entity>, CoreError> {
    let spec = &cr.spec;
    if spec.resource_pool_id.is_empty() {
        return Err(CoreError::conversion(
            "ResourcePool",
            &cr.metadata.name,
            "empty resourcePoolId",
        ));
    }

    Ok(Some(Entity::ResourcePool(ResourcePool {
        resource_pool_id: make_uuid_from_names(
            RESOURCE_POOL_NAMESPACE,
            ctx.cloud_id,
            &[&spec.resource_pool_id],
        ),
        global_location_id: ctx.global_cloud_id,
        name: spec.name.clone(),
        description: spec.description.clone(),
        o_cloud_id: ctx.cloud_id,
        location: spec.location.clone(),
        o_cloud_site_id: Some(make_uuid_from_names(
            OCLOUD_SITE_NAMESPACE,
            ctx.cloud_id,
            &[&spec.o_cloud_site_id],
        )),
        extensions: string_extensions(spec.extensions.as_ref()),
        data_source_id: ctx.data_source_id,
        generation_id: ctx.generation_id,
        external_id: object_key(cr),
        created_at: None,
    })))
}
