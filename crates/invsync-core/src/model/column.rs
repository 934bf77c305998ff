// Column value helpers shared by the entity mappings.
//
// Identifiers are stored as hyphenated text, structured fields as JSON text,
// and timestamps as RFC 3339 text.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub(crate) fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

pub(crate) fn uuid(value: Uuid) -> Value {
    Value::Text(value.hyphenated().to_string())
}

pub(crate) fn opt_uuid(value: Option<Uuid>) -> Value {
    value.map_or(Value::Null, uuid)
}

pub(crate) fn int(value: i64) -> Value {
    Value::Integer(value)
}

/// JSON text; `None` and JSON `null` both become SQL NULL.
pub(crate) fn json<T: Serialize>(value: Option<&T>) -> Value {
    match value.map(serde_json::to_string) {
        Some(Ok(encoded)) if encoded != "null" => Value::Text(encoded),
        _ => Value::Null,
    }
}

fn conversion_failure(
    row: &Row<'_>,
    column: &str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

pub(crate) fn read_uuid(row: &Row<'_>, column: &str) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(column)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_failure(row, column, e))
}

pub(crate) fn read_opt_uuid(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_failure(row, column, e)))
        .transpose()
}

pub(crate) fn read_json<T: DeserializeOwned>(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_failure(row, column, e)))
        .transpose()
}

pub(crate) fn read_timestamp(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_failure(row, column, e))
    })
    .transpose()
}
