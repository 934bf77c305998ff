// ── Resource ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{int, json, opt_text, read_json, read_timestamp, read_uuid, text, uuid};
use super::{EntityKind, Extensions, Model};

/// A single inventory item (typically one host) within a resource pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: Uuid,
    pub resource_type_id: Uuid,
    pub resource_pool_id: Uuid,
    pub global_asset_id: Option<String>,
    pub description: String,
    pub extensions: Option<Extensions>,
    pub groups: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub external_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of a [`Resource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    pub resource_id: Uuid,
    pub resource_type_id: Uuid,
    pub resource_pool_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<&Resource> for ResourceObject {
    fn from(resource: &Resource) -> Self {
        Self {
            resource_id: resource.resource_id,
            resource_type_id: resource.resource_type_id,
            resource_pool_id: resource.resource_pool_id,
            global_asset_id: resource.global_asset_id.clone(),
            description: resource.description.clone(),
            extensions: resource.extensions.clone(),
            groups: resource.groups.clone(),
            tags: resource.tags.clone(),
        }
    }
}

impl Model for Resource {
    const TABLE: &'static str = "resource";
    const PRIMARY_KEY: &'static str = "resource_id";
    const KIND: EntityKind = EntityKind::Resource;

    type External = ResourceObject;

    fn id(&self) -> Uuid {
        self.resource_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.resource_pool_id)
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("resource_id", uuid(self.resource_id)),
            ("resource_type_id", uuid(self.resource_type_id)),
            ("resource_pool_id", uuid(self.resource_pool_id)),
            ("global_asset_id", opt_text(self.global_asset_id.as_deref())),
            ("description", text(&self.description)),
            ("extensions", json(self.extensions.as_ref())),
            ("resource_groups", json(self.groups.as_ref())),
            ("tags", json(self.tags.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
            ("external_id", text(&self.external_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource_id: read_uuid(row, "resource_id")?,
            resource_type_id: read_uuid(row, "resource_type_id")?,
            resource_pool_id: read_uuid(row, "resource_pool_id")?,
            global_asset_id: row.get("global_asset_id")?,
            description: row.get("description")?,
            extensions: read_json(row, "extensions")?,
            groups: read_json(row, "resource_groups")?,
            tags: read_json(row, "tags")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            external_id: row.get("external_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> ResourceObject {
        ResourceObject::from(self)
    }
}
