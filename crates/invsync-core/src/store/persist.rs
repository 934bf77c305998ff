// ── Diff-and-notify persistence ──
//
// `persist` upserts one entity and reports its before/after rows. The
// `*_with_change_event` wrappers run inside a single transaction and record
// a change event only when the external projection actually differs.

use rusqlite::{Connection, params};
use rusqlite::types::Value;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Database, query};
use crate::error::CoreError;
use crate::model::column::{json, opt_uuid, text, uuid};
use crate::model::{DataChangeEvent, EntityKind, Model};

/// Upserts `obj`, returning `(before, after)`.
///
/// An existing row is updated only in the columns whose values differ.
/// When nothing differs, both states are the existing row.
fn persist<T: Model>(conn: &Connection, obj: &T) -> Result<(Option<T>, T), CoreError> {
    let id = obj.id();
    let Some(existing) = query::find::<T>(conn, id)? else {
        query::insert(conn, obj)?;
        let after = reload::<T>(conn, id)?;
        return Ok((None, after));
    };

    let changed: Vec<(&'static str, Value)> = obj
        .columns()
        .into_iter()
        .zip(existing.columns())
        .filter(|((_, incoming), (_, current))| incoming != current)
        .map(|(column, _)| column)
        .collect();

    if changed.is_empty() {
        warn!(table = T::TABLE, id = %id, "no change detected on persisted object");
        return Ok((Some(existing.clone()), existing));
    }

    debug!(
        table = T::TABLE,
        id = %id,
        columns = ?changed.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "updating changed columns"
    );
    query::update::<T>(conn, id, &changed)?;
    let after = reload::<T>(conn, id)?;
    Ok((Some(existing), after))
}

fn reload<T: Model>(conn: &Connection, id: Uuid) -> Result<T, CoreError> {
    query::find::<T>(conn, id)?.ok_or_else(|| CoreError::NotFound {
        entity_type: T::KIND.to_string(),
        identifier: id.to_string(),
    })
}

fn insert_change_event(
    conn: &Connection,
    kind: EntityKind,
    object_id: Uuid,
    parent_id: Option<Uuid>,
    before: Option<&serde_json::Value>,
    after: Option<&serde_json::Value>,
) -> Result<DataChangeEvent, CoreError> {
    conn.execute(
        "INSERT INTO data_change_event \
         (data_change_id, object_type, object_id, parent_id, before_state, after_state) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid(Uuid::new_v4()),
            text(kind.as_ref()),
            uuid(object_id),
            opt_uuid(parent_id),
            json(before),
            json(after),
        ],
    )?;
    let sequence_id = conn.last_insert_rowid();
    let event = conn.query_row(
        "SELECT * FROM data_change_event WHERE sequence_id = ?1",
        params![sequence_id],
        DataChangeEvent::from_row,
    )?;
    Ok(event)
}

impl Database {
    /// Persists `obj` and, in the same transaction, records a change event
    /// if `convert(before) != convert(after)`.
    ///
    /// Returns the recorded event, or `None` when the projection is unchanged.
    pub fn persist_with_change_event<T, V, F>(
        &self,
        obj: &T,
        parent_id: Option<Uuid>,
        convert: F,
    ) -> Result<Option<DataChangeEvent>, CoreError>
    where
        T: Model,
        V: Serialize + PartialEq,
        F: Fn(&T) -> V,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let (before, after) = persist(&tx, obj)?;
        let before = before.as_ref().map(&convert);
        let after = convert(&after);

        let event = if before.as_ref() == Some(&after) {
            None
        } else {
            let before = before.map(|b| serde_json::to_value(&b)).transpose()?;
            let after = serde_json::to_value(&after)?;
            Some(insert_change_event(
                &tx,
                T::KIND,
                obj.id(),
                parent_id,
                before.as_ref(),
                Some(&after),
            )?)
        };

        tx.commit()?;
        Ok(event)
    }

    /// Deletes `obj` and, in the same transaction, records a change event
    /// carrying the deleted row's projection as its before state.
    ///
    /// Deleting a row that does not exist records nothing.
    pub fn delete_with_change_event<T, V, F>(
        &self,
        obj: &T,
        parent_id: Option<Uuid>,
        convert: F,
    ) -> Result<Option<DataChangeEvent>, CoreError>
    where
        T: Model,
        V: Serialize + PartialEq,
        F: Fn(&T) -> V,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let Some(existing) = query::find::<T>(&tx, obj.id())? else {
            debug!(table = T::TABLE, id = %obj.id(), "delete of absent row ignored");
            return Ok(None);
        };
        query::delete::<T>(&tx, existing.id())?;

        let before = serde_json::to_value(convert(&existing))?;
        let event = insert_change_event(
            &tx,
            T::KIND,
            existing.id(),
            parent_id,
            Some(&before),
            None,
        )?;

        tx.commit()?;
        Ok(Some(event))
    }

    /// [`persist_with_change_event`](Self::persist_with_change_event) using the
    /// model's own projection and parent.
    pub fn persist_model<T: Model>(&self, obj: &T) -> Result<Option<DataChangeEvent>, CoreError> {
        self.persist_with_change_event(obj, obj.parent_id(), T::to_external)
    }

    /// [`delete_with_change_event`](Self::delete_with_change_event) using the
    /// model's own projection and parent.
    pub fn delete_model<T: Model>(&self, obj: &T) -> Result<Option<DataChangeEvent>, CoreError> {
        self.delete_with_change_event(obj, obj.parent_id(), T::to_external)
    }
}
