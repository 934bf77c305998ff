// ── ResourceType ──

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::column::{int, json, read_json, read_timestamp, read_uuid, text, uuid};
use super::{EntityKind, Extensions, Model};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    #[default]
    Undefined,
    Physical,
    Logical,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceClass {
    #[default]
    Undefined,
    Compute,
    Networking,
    Storage,
}

/// Classification shared by resources of the same make and model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub resource_type_id: Uuid,
    pub name: String,
    pub description: String,
    pub vendor: String,
    pub model: String,
    pub version: String,
    pub resource_kind: ResourceKind,
    pub resource_class: ResourceClass,
    pub extensions: Option<Extensions>,
    pub data_source_id: Uuid,
    pub generation_id: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Externally visible shape of a [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeObject {
    pub resource_type_id: Uuid,
    pub name: String,
    pub description: String,
    pub vendor: String,
    pub model: String,
    pub version: String,
    pub resource_kind: ResourceKind,
    pub resource_class: ResourceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl From<&ResourceType> for ResourceTypeObject {
    fn from(rt: &ResourceType) -> Self {
        Self {
            resource_type_id: rt.resource_type_id,
            name: rt.name.clone(),
            description: rt.description.clone(),
            vendor: rt.vendor.clone(),
            model: rt.model.clone(),
            version: rt.version.clone(),
            resource_kind: rt.resource_kind,
            resource_class: rt.resource_class,
            extensions: rt.extensions.clone(),
        }
    }
}

fn read_enum<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = strum::ParseError>,
{
    let raw: String = row.get(column)?;
    T::from_str(&raw).map_err(|e| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}

impl Model for ResourceType {
    const TABLE: &'static str = "resource_type";
    const PRIMARY_KEY: &'static str = "resource_type_id";
    const KIND: EntityKind = EntityKind::ResourceType;

    type External = ResourceTypeObject;

    fn id(&self) -> Uuid {
        self.resource_type_id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("resource_type_id", uuid(self.resource_type_id)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("vendor", text(&self.vendor)),
            ("model", text(&self.model)),
            ("version", text(&self.version)),
            ("resource_kind", text(&self.resource_kind.to_string())),
            ("resource_class", text(&self.resource_class.to_string())),
            ("extensions", json(self.extensions.as_ref())),
            ("data_source_id", uuid(self.data_source_id)),
            ("generation_id", int(self.generation_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource_type_id: read_uuid(row, "resource_type_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            vendor: row.get("vendor")?,
            model: row.get("model")?,
            version: row.get("version")?,
            resource_kind: read_enum(row, "resource_kind")?,
            resource_class: read_enum(row, "resource_class")?,
            extensions: read_json(row, "extensions")?,
            data_source_id: read_uuid(row, "data_source_id")?,
            generation_id: row.get("generation_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }

    fn to_external(&self) -> ResourceTypeObject {
        ResourceTypeObject::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_class_use_screaming_case() {
        assert_eq!(ResourceKind::Physical.to_string(), "PHYSICAL");
        assert_eq!(ResourceClass::Compute.to_string(), "COMPUTE");
        assert_eq!(
            serde_json::to_value(ResourceClass::Networking).ok(),
            Some(serde_json::json!("NETWORKING"))
        );
    }
}
