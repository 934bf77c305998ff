// ── OCloudSite ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{int, json, read_json, read_timestamp, read_uuid, text, uuid};
use super::{EntityKind, Extensions, Model};

/// A cloud site, tying resource pools to a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OCloudSite {
    pub o_cloud_site_id: Uuid,
    pub global_location_id: String,
    pub name: String,
    pub description: String,
    pub extensions: Option<Extensions>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub external_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of an [`OCloudSite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OCloudSiteObject {
    #[serde(rename = "oCloudSiteId")]
    pub o_cloud_site_id: Uuid,
    pub global_location_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl From<&OCloudSite> for OCloudSiteObject {
    fn from(site: &OCloudSite) -> Self {
        Self {
            o_cloud_site_id: site.o_cloud_site_id,
            global_location_id: site.global_location_id.clone(),
            name: site.name.clone(),
            description: site.description.clone(),
            extensions: site.extensions.clone(),
        }
    }
}

impl Model for OCloudSite {
    const TABLE: &'static str = "o_cloud_site";
    const PRIMARY_KEY: &'static str = "o_cloud_site_id";
    const KIND: EntityKind = EntityKind::OCloudSite;

    type External = OCloudSiteObject;

    fn id(&self) -> Uuid {
        self.o_cloud_site_id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("o_cloud_site_id", uuid(self.o_cloud_site_id)),
            ("global_location_id", text(&self.global_location_id)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("extensions", json(self.extensions.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
            ("external_id", text(&self.external_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            o_cloud_site_id: read_uuid(row, "o_cloud_site_id")?,
            global_location_id: row.get("global_location_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            extensions: read_json(row, "extensions")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            external_id: row.get("external_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> OCloudSiteObject {
        OCloudSiteObject::from(self)
    }
}
