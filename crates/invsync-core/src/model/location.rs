// ── Location ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{int, json, opt_text, read_json, read_timestamp, read_uuid, text, uuid};
use super::{EntityKind, Extensions, Model};

/// A physical location, keyed externally by its global location id.
///
/// `location_id` is derived from `global_location_id`, so the two identify
/// the same row; the global id is the uniqueness constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: Uuid,
    pub global_location_id: String,
    pub name: String,
    pub description: String,
    /// GeoJSON point, `{"type": "Point", "coordinates": [lon, lat(, alt)]}`.
    pub coordinate: Option<serde_json::Value>,
    /// `[{"caType": n, "caValue": "..."}]`
    pub civic_address: Option<Vec<serde_json::Value>>,
    pub address: Option<String>,
    pub extensions: Option<Extensions>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub external_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of a [`Location`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationObject {
    pub global_location_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub civic_address: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl From<&Location> for LocationObject {
    fn from(location: &Location) -> Self {
        Self {
            global_location_id: location.global_location_id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
            coordinate: location.coordinate.clone(),
            civic_address: location.civic_address.clone(),
            address: location.address.clone(),
            extensions: location.extensions.clone(),
        }
    }
}

impl Model for Location {
    const TABLE: &'static str = "location";
    const PRIMARY_KEY: &'static str = "location_id";
    const CONFLICT_KEY: &'static str = "global_location_id";
    const KIND: EntityKind = EntityKind::Location;

    type External = LocationObject;

    fn id(&self) -> Uuid {
        self.location_id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("location_id", uuid(self.location_id)),
            ("global_location_id", text(&self.global_location_id)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("coordinate", json(self.coordinate.as_ref())),
            ("civic_address", json(self.civic_address.as_ref())),
            ("address", opt_text(self.address.as_deref())),
            ("extensions", json(self.extensions.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
            ("external_id", text(&self.external_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            location_id: read_uuid(row, "location_id")?,
            global_location_id: row.get("global_location_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            coordinate: read_json(row, "coordinate")?,
            civic_address: read_json(row, "civic_address")?,
            address: row.get("address")?,
            extensions: read_json(row, "extensions")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            external_id: row.get("external_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> LocationObject {
        LocationObject::from(self)
    }
}
