// ── Persisted data-source identity ──

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::column::{read_timestamp, read_uuid};

/// Identity and generation of one logical data source, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceRecord {
    pub data_source_id: Uuid,
    pub name: String,
    pub generation_id: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl DataSourceRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            data_source_id: read_uuid(row, "data_source_id")?,
            name: row.get("name")?,
            generation_id: row.get("generation_id")?,
            created_at: read_timestamp(row, "created_at")?,
        })
    }
}
