// Watches `OCloudSite` custom resources declared on the hub.

use std::sync::Arc;

use invsync_api::kube::{HubClient, OCloudSite as OCloudSiteCr};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::watch::{ConvertContext, ForwardingHandler, object_key, spawn_watch, string_extensions};
use super::{DataSource, SourceState, WatchableDataSource};
use crate::error::CoreError;
use crate::event::AsyncEventType;
use crate::model::ids::{OCLOUD_SITE_NAMESPACE, make_uuid_from_names};
use crate::model::{Entity, EntityKind, OCloudSite};

pub const OCLOUD_SITE_SOURCE_NAME: &str = "OCloudSite";

pub struct OCloudSiteDataSource {
    hub: HubClient,
    cloud_id: Uuid,
    state: Arc<SourceState>,
}

impl OCloudSiteDataSource {
    pub fn new(hub: HubClient, cloud_id: Uuid) -> Self {
        Self {
            hub,
            cloud_id,
            state: SourceState::new(),
        }
    }
}

impl DataSource for OCloudSiteDataSource {
    fn name(&self) -> &str {
        OCLOUD_SITE_SOURCE_NAME
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
        Some(self)
    }
}

impl WatchableDataSource for OCloudSiteDataSource {
    fn watch(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let handler = ForwardingHandler {
            state: Arc::clone(&self.state),
            source_name: OCLOUD_SITE_SOURCE_NAME.to_owned(),
            kind: EntityKind::OCloudSite,
            cloud_id: self.cloud_id,
            global_cloud_id: Uuid::nil(),
            convert: convert_ocloud_site,
        };
        Ok(spawn_watch(
            "ocloud-site-reflector",
            self.hub.clone(),
            handler,
            cancel,
        ))
    }
}

pub(crate) fn convert_ocloud_site(
    cr: &OCloudSiteCr,
    _event_type: AsyncEventType,
    ctx: &ConvertContext,
) -> Result<Option<Entity>, CoreError> {
    let spec = &cr.spec;
    if spec.site_id.is_empty() {
        return Err(CoreError::conversion(
            "OCloudSite",
            &cr.metadata.name,
            "empty siteId",
        ));
    }

    Ok(Some(Entity::OCloudSite(OCloudSite {
        o_cloud_site_id: make_uuid_from_names(OCLOUD_SITE_NAMESPACE, ctx.cloud_id, &[&spec.site_id]),
        global_location_id: spec.global_location_id.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        extensions: string_extensions(spec.extensions.as_ref()),
        data_source_id: ctx.data_source_id,
        generation_id: ctx.generation_id,
        external_id: object_key(cr),
        created_at: None,
    })))
}
