// ── DeploymentManager ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{int, json, read_json, read_timestamp, read_uuid, text, uuid};
use super::{EntityKind, Extensions, Model};

/// A workload cluster able to host deployments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManager {
    pub deployment_manager_id: Uuid,
    pub name: String,
    pub description: String,
    pub o_cloud_id: Uuid,
    pub url: String,
    pub locations: Vec<String>,
    pub capabilities: BTreeMap<String, String>,
    pub capacity_info: BTreeMap<String, String>,
    pub extensions: Option<Extensions>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub external_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of a [`DeploymentManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManagerObject {
    pub deployment_manager_id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "oCloudId")]
    pub o_cloud_id: Uuid,
    pub service_uri: String,
    pub supported_locations: Vec<String>,
    pub capabilities: BTreeMap<String, String>,
    pub capacity_info: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl From<&DeploymentManager> for DeploymentManagerObject {
    fn from(dm: &DeploymentManager) -> Self {
        Self {
            deployment_manager_id: dm.deployment_manager_id,
            name: dm.name.clone(),
            description: dm.description.clone(),
            o_cloud_id: dm.o_cloud_id,
            service_uri: dm.url.clone(),
            supported_locations: dm.locations.clone(),
            capabilities: dm.capabilities.clone(),
            capacity_info: dm.capacity_info.clone(),
            extensions: dm.extensions.clone(),
        }
    }
}

impl Model for DeploymentManager {
    const TABLE: &'static str = "deployment_manager";
    const PRIMARY_KEY: &'static str = "deployment_manager_id";
    const KIND: EntityKind = EntityKind::DeploymentManager;

    type External = DeploymentManagerObject;

    fn id(&self) -> Uuid {
        self.deployment_manager_id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("deployment_manager_id", uuid(self.deployment_manager_id)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("o_cloud_id", uuid(self.o_cloud_id)),
            ("url", text(&self.url)),
            ("locations", json(Some(&self.locations))),
            ("capabilities", json(Some(&self.capabilities))),
            ("capacity_info", json(Some(&self.capacity_info))),
            ("extensions", json(self.extensions.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
            ("external_id", text(&self.external_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            deployment_manager_id: read_uuid(row, "deployment_manager_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            o_cloud_id: read_uuid(row, "o_cloud_id")?,
            url: row.get("url")?,
            locations: read_json(row, "locations")?.unwrap_or_default(),
            capabilities: read_json(row, "capabilities")?.unwrap_or_default(),
            capacity_info: read_json(row, "capacity_info")?.unwrap_or_default(),
            extensions: read_json(row, "extensions")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            external_id: row.get("external_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> DeploymentManagerObject {
        DeploymentManagerObject::from(self)
    }
}
