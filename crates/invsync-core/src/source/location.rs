// Watches `Location` custom resources declared on the hub.

use std::sync::Arc;

use invsync_api::kube::{CivicAddressElement, GeoLocation, HubClient, Location as LocationCr};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::watch::{ConvertContext, ForwardingHandler, object_key, spawn_watch, string_extensions};
use super::{DataSource, SourceState, WatchableDataSource};
use crate::error::CoreError;
use crate::event::AsyncEventType;
use crate::model::ids::{LOCATION_NAMESPACE, make_uuid_from_names};
use crate::model::{Entity, EntityKind, Location};

pub const LOCATION_SOURCE_NAME: &str = "Location";

pub struct LocationDataSource {
    hub: HubClient,
    cloud_id: Uuid,
    state: Arc<SourceState>,
}

impl LocationDataSource {
    pub fn new(hub: HubClient, cloud_id: Uuid) -> Self {
        Self {
            hub,
            cloud_id,
            state: SourceState::new(),
        }
    }
}

impl DataSource for LocationDataSource {
    fn name(&self) -> &str {
        LOCATION_SOURCE_NAME
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
        Some(self)
    }
}

impl WatchableDataSource for LocationDataSource {
    fn watch(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let handler = ForwardingHandler {
            state: Arc::clone(&self.state),
            source_name: LOCATION_SOURCE_NAME.to_owned(),
            kind: EntityKind::Location,
            cloud_id: self.cloud_id,
            global_cloud_id: Uuid::nil(),
            convert: convert_location,
        };
        Ok(spawn_watch(
            "location-reflector",
            self.hub.clone(),
            handler,
            cancel,
        ))
    }
}

pub(crate) fn convert_location(
    cr: &LocationCr,
    _event_type: AsyncEventType,
    ctx: &ConvertContext,
) -> Result<Option<Entity>, CoreError> {
    let spec = &cr.spec;
    let name = &cr.metadata.name;
    if spec.global_location_id.is_empty() {
        return Err(CoreError::conversion("Location", name, "empty globalLocationId"));
    }

    let coordinate = spec
        .coordinate
        .as_ref()
        .map(geo_json_point)
        .transpose()
        .map_err(|reason| CoreError::conversion("Location", name, reason))?;

    Ok(Some(Entity::Location(Location {
        location_id: make_uuid_from_names(
            LOCATION_NAMESPACE,
            ctx.cloud_id,
            &[&spec.global_location_id],
        ),
        global_location_id: spec.global_location_id.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        coordinate,
        civic_address: civic_address(&spec.civic_address),
        address: spec.address.clone(),
        extensions: string_extensions(spec.extensions.as_ref()),
        data_source_id: ctx.data_source_id,
        generation_id: ctx.generation_id,
        external_id: object_key(cr),
        created_at: None,
    })))
}

/// GeoJSON point: `[longitude, latitude]`, plus altitude when present.
fn geo_json_point(geo: &GeoLocation) -> Result<Value, String> {
    let parse = |field: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {field} '{raw}': {e}"))
    };

    let mut coordinates = vec![
        parse("longitude", &geo.longitude)?,
        parse("latitude", &geo.latitude)?,
    ];
    if let Some(altitude) = &geo.altitude {
        coordinates.push(parse("altitude", altitude)?);
    }
    Ok(json!({"type": "Point", "coordinates": coordinates}))
}

fn civic_address(elements: &[CivicAddressElement]) -> Option<Vec<Value>> {
    if elements.is_empty() {
        return None;
    }
    Some(
        elements
            .iter()
            .map(|e| json!({"caType": e.ca_type, "caValue": e.ca_value}))
            .collect(),
    )
}
