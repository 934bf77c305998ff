// ── Inventory store ──
//
// SQLite-backed persistence for canonical entities, data-source identities
// and change events. One connection behind a mutex; every diff-and-notify
// write runs in its own transaction.

mod persist;
mod query;
mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::column::uuid;
use crate::model::{DataChangeEvent, DataSourceRecord, Model};

/// Handle to the inventory database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Config {
                message: format!("cannot create database directory {}: {e}", parent.display()),
            })?;
        }
        debug!(path = %path.display(), "opening inventory database");
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Data sources ─────────────────────────────────────────────────

    pub fn data_source_by_name(&self, name: &str) -> Result<Option<DataSourceRecord>, CoreError> {
        let conn = self.lock();
        let record = conn
            .query_row(
                "SELECT * FROM data_source WHERE name = ?1",
                params![name],
                DataSourceRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Creates a new data-source identity with a fresh random id.
    pub fn create_data_source(
        &self,
        name: &str,
        generation_id: i64,
    ) -> Result<DataSourceRecord, CoreError> {
        let conn = self.lock();
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO data_source (data_source_id, name, generation_id) VALUES (?1, ?2, ?3)",
            params![uuid(id), name, generation_id],
        )?;
        let record = conn.query_row(
            "SELECT * FROM data_source WHERE data_source_id = ?1",
            params![uuid(id)],
            DataSourceRecord::from_row,
        )?;
        Ok(record)
    }

    pub fn update_data_source_generation(
        &self,
        data_source_id: Uuid,
        generation_id: i64,
    ) -> Result<(), CoreError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE data_source SET generation_id = ?1 WHERE data_source_id = ?2",
            params![generation_id, uuid(data_source_id)],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound {
                entity_type: "data source".into(),
                identifier: data_source_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn data_sources(&self) -> Result<Vec<DataSourceRecord>, CoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM data_source ORDER BY name")?;
        let rows = stmt.query_map([], DataSourceRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Change events ────────────────────────────────────────────────

    /// Change events with `sequence_id > after`, oldest first.
    pub fn change_events_after(
        &self,
        after: i64,
        limit: u32,
    ) -> Result<Vec<DataChangeEvent>, CoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM data_change_event WHERE sequence_id > ?1 ORDER BY sequence_id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![after, limit], DataChangeEvent::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Entity queries ───────────────────────────────────────────────

    pub fn find<T: Model>(&self, id: Uuid) -> Result<Option<T>, CoreError> {
        Ok(query::find::<T>(&self.lock(), id)?)
    }

    /// Rows of a data source last written by an older generation.
    pub fn find_stale<T: Model>(
        &self,
        data_source_id: Uuid,
        generation_id: i64,
    ) -> Result<Vec<T>, CoreError> {
        Ok(query::find_stale::<T>(
            &self.lock(),
            data_source_id,
            generation_id,
        )?)
    }

    /// Rows of a data source whose ids are not in `keys`.
    pub fn find_not_in<T: Model>(
        &self,
        data_source_id: Uuid,
        keys: &[Uuid],
    ) -> Result<Vec<T>, CoreError> {
        let rows = query::find_by_data_source::<T>(&self.lock(), data_source_id)?;
        let keys: std::collections::HashSet<&Uuid> = keys.iter().collect();
        Ok(rows.into_iter().filter(|r| !keys.contains(&r.id())).collect())
    }
}
