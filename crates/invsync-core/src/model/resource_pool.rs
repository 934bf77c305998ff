// ── ResourcePool ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{
    int, json, opt_text, opt_uuid, read_json, read_opt_uuid, read_timestamp, read_uuid, text, uuid,
};
use super::{EntityKind, Extensions, Model};

/// A grouping of resources reported by one data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub resource_pool_id: Uuid,
    pub global_location_id: Uuid,
    pub name: String,
    pub description: String,
    pub o_cloud_id: Uuid,
    pub location: Option<String>,
    pub o_cloud_site_id: Option<Uuid>,
    pub extensions: Option<Extensions>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub external_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of a [`ResourcePool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePoolObject {
    pub resource_pool_id: Uuid,
    pub global_location_id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "oCloudId")]
    pub o_cloud_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "oCloudSiteId", skip_serializing_if = "Option::is_none")]
    pub o_cloud_site_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl From<&ResourcePool> for ResourcePoolObject {
    fn from(pool: &ResourcePool) -> Self {
        Self {
            resource_pool_id: pool.resource_pool_id,
            global_location_id: pool.global_location_id,
            name: pool.name.clone(),
            description: pool.description.clone(),
            o_cloud_id: pool.o_cloud_id,
            location: pool.location.clone(),
            o_cloud_site_id: pool.o_cloud_site_id,
            extensions: pool.extensions.clone(),
        }
    }
}

impl Model for ResourcePool {
    const TABLE: &'static str = "resource_pool";
    const PRIMARY_KEY: &'static str = "resource_pool_id";
    const KIND: EntityKind = EntityKind::ResourcePool;

    type External = ResourcePoolObject;

    fn id(&self) -> Uuid {
        self.resource_pool_id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("resource_pool_id", uuid(self.resource_pool_id)),
            ("global_location_id", uuid(self.global_location_id)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("o_cloud_id", uuid(self.o_cloud_id)),
            ("location", opt_text(self.location.as_deref())),
            ("o_cloud_site_id", opt_uuid(self.o_cloud_site_id)),
            ("extensions", json(self.extensions.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
            ("external_id", text(&self.external_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource_pool_id: read_uuid(row, "resource_pool_id")?,
            global_location_id: read_uuid(row, "global_location_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            o_cloud_id: read_uuid(row, "o_cloud_id")?,
            location: row.get("location")?,
            o_cloud_site_id: read_opt_uuid(row, "o_cloud_site_id")?,
            extensions: read_json(row, "extensions")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            external_id: row.get("external_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> ResourcePoolObject {
        ResourcePoolObject::from(self)
    }
}
