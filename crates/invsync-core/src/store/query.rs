// Generic row access over the explicit `Model` column mapping.
//
// Every function takes a plain `&Connection` so it runs equally inside a
// transaction (`Transaction` derefs to `Connection`).

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::model::Model;
use crate::model::column::uuid;

pub(super) fn find<T: Model>(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<T>> {
    let sql = format!("SELECT * FROM {} WHERE {} = ?1", T::TABLE, T::PRIMARY_KEY);
    conn.query_row(&sql, params![uuid(id)], T::from_row)
        .optional()
}

pub(super) fn find_stale<T: Model>(
    conn: &Connection,
    data_source_id: Uuid,
    generation_id: i64,
) -> rusqlite::Result<Vec<T>> {
    let sql = format!(
        "SELECT * FROM {} WHERE data_source_id = ?1 AND generation_id < ?2",
        T::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![uuid(data_source_id), generation_id], T::from_row)?;
    rows.collect()
}

pub(super) fn find_by_data_source<T: Model>(
    conn: &Connection,
    data_source_id: Uuid,
) -> rusqlite::Result<Vec<T>> {
    let sql = format!("SELECT * FROM {} WHERE data_source_id = ?1", T::TABLE);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![uuid(data_source_id)], T::from_row)?;
    rows.collect()
}

/// Inserts `obj`; a row already holding its conflict key is overwritten.
pub(super) fn insert<T: Model>(conn: &Connection, obj: &T) -> rusqlite::Result<()> {
    let columns = obj.columns();
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let assignments: Vec<String> = names
        .iter()
        .filter(|name| **name != T::CONFLICT_KEY)
        .map(|name| format!("{name} = excluded.{name}"))
        .collect();

    let sql = format!(
        "INSERT INTO {table} ({names}) VALUES ({placeholders}) \
         ON CONFLICT ({conflict}) DO UPDATE SET {assignments}",
        table = T::TABLE,
        names = names.join(", "),
        placeholders = placeholders.join(", "),
        conflict = T::CONFLICT_KEY,
        assignments = assignments.join(", "),
    );
    conn.execute(&sql, params_from_iter(columns.iter().map(|(_, value)| value)))?;
    Ok(())
}

/// Updates only the given columns of the row identified by `id`.
pub(super) fn update<T: Model>(
    conn: &Connection,
    id: Uuid,
    changed: &[(&'static str, Value)],
) -> rusqlite::Result<usize> {
    let assignments: Vec<String> = changed
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{name} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        T::TABLE,
        assignments.join(", "),
        T::PRIMARY_KEY,
        changed.len() + 1
    );
    let mut values: Vec<Value> = changed.iter().map(|(_, value)| value.clone()).collect();
    values.push(uuid(id));
    conn.execute(&sql, params_from_iter(values.iter()))
}

pub(super) fn delete<T: Model>(conn: &Connection, id: Uuid) -> rusqlite::Result<usize> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", T::TABLE, T::PRIMARY_KEY);
    conn.execute(&sql, params![uuid(id)])
}
