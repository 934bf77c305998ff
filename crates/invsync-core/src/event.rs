// ── Async change events ──
//
// Envelope passed from watchable data sources to the collector over the
// shared bounded channel.

use std::fmt;

use uuid::Uuid;

use crate::model::{Entity, EntityKind};

/// What happened to the carried object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncEventType {
    Updated,
    Deleted,
    /// A full relist finished; rows of this kind not named in `keys` are stale.
    SyncComplete,
}

impl fmt::Display for AsyncEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::SyncComplete => "sync-complete",
        })
    }
}

/// One mutation (or end-of-relist marker) reported by a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncChangeEvent {
    pub data_source_id: Uuid,
    pub event_type: AsyncEventType,
    pub kind: EntityKind,
    /// Present for `Updated` and `Deleted`.
    pub object: Option<Entity>,
    /// Present for `SyncComplete`.
    pub keys: Vec<Uuid>,
}

impl AsyncChangeEvent {
    pub fn updated(data_source_id: Uuid, object: Entity) -> Self {
        Self::single(data_source_id, AsyncEventType::Updated, object)
    }

    pub fn deleted(data_source_id: Uuid, object: Entity) -> Self {
        Self::single(data_source_id, AsyncEventType::Deleted, object)
    }

    /// `Updated` or `Deleted` event carrying one object.
    pub(crate) fn single(data_source_id: Uuid, event_type: AsyncEventType, object: Entity) -> Self {
        Self {
            data_source_id,
            event_type,
            kind: object.kind(),
            object: Some(object),
            keys: Vec::new(),
        }
    }

    pub fn sync_complete(data_source_id: Uuid, kind: EntityKind, keys: Vec<Uuid>) -> Self {
        Self {
            data_source_id,
            event_type: AsyncEventType::SyncComplete,
            kind,
            object: None,
            keys,
        }
    }
}
