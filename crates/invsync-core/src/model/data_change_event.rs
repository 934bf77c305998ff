// ── DataChangeEvent ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityKind;
use super::column::{read_json, read_opt_uuid, read_timestamp, read_uuid};

/// A persisted before/after transition of an entity's external projection.
///
/// `sequence_id` is assigned by the store on insert and strictly increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeEvent {
    pub data_change_id: Uuid,
    pub sequence_id: i64,
    pub object_type: EntityKind,
    pub object_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DataChangeEvent {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let object_type: String = row.get("object_type")?;
        let object_type = object_type.parse::<EntityKind>().map_err(|e| {
            let index = row.as_ref().column_index("object_type").unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(Self {
            data_change_id: read_uuid(row, "data_change_id")?,
            sequence_id: row.get("sequence_id")?,
            object_type,
            object_id: read_uuid(row, "object_id")?,
            parent_id: read_opt_uuid(row, "parent_id")?,
            before_state: read_json(row, "before_state")?,
            after_state: read_json(row, "after_state")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }
}
