// ── Canonical inventory model ──
//
// Backend-agnostic entities every data source converges on. Each entity
// maps explicitly onto one SQLite table through the `Model` trait and
// projects into an externally visible shape used for change detection.

pub(crate) mod column;
pub mod data_change_event;
pub mod data_source;
pub mod deployment_manager;
pub mod ids;
pub mod location;
pub mod ocloud_site;
pub mod resource;
pub mod resource_pool;
pub mod resource_type;

pub use data_change_event::DataChangeEvent;
pub use data_source::DataSourceRecord;
pub use deployment_manager::DeploymentManager;
pub use location::Location;
pub use ocloud_site::OCloudSite;
pub use resource::Resource;
pub use resource_pool::ResourcePool;
pub use resource_type::{ResourceClass, ResourceKind, ResourceType};

use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Free-form extension attributes carried by most entities.
pub type Extensions = serde_json::Map<String, serde_json::Value>;

// ── Model ────────────────────────────────────────────────────────────

/// A persisted canonical entity.
///
/// The column mapping is explicit: `columns()` yields every stored column
/// except `created_at`, primary key first, and `from_row` reads the same
/// set back. The diff engine compares these values column by column.
pub trait Model: Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Column the insert path treats as the uniqueness constraint.
    const CONFLICT_KEY: &'static str = Self::PRIMARY_KEY;
    const KIND: EntityKind;

    /// Externally visible projection compared when deciding whether a
    /// change event is due.
    type External: Serialize + PartialEq + Send;

    fn id(&self) -> Uuid;

    /// Owning entity, recorded on change events.
    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    fn columns(&self) -> Vec<(&'static str, Value)>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn to_external(&self) -> Self::External;
}

// ── EntityKind ───────────────────────────────────────────────────────

/// Discriminant of the canonical entity types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum EntityKind {
    ResourcePool,
    Resource,
    ResourceType,
    DeploymentManager,
    Location,
    OCloudSite,
}

// ── Entity ───────────────────────────────────────────────────────────

/// Any canonical entity, as carried by async change events.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    ResourcePool(ResourcePool),
    Resource(Resource),
    ResourceType(ResourceType),
    DeploymentManager(DeploymentManager),
    Location(Location),
    OCloudSite(OCloudSite),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ResourcePool(_) => EntityKind::ResourcePool,
            Self::Resource(_) => EntityKind::Resource,
            Self::ResourceType(_) => EntityKind::ResourceType,
            Self::DeploymentManager(_) => EntityKind::DeploymentManager,
            Self::Location(_) => EntityKind::Location,
            Self::OCloudSite(_) => EntityKind::OCloudSite,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::ResourcePool(e) => e.id(),
            Self::Resource(e) => e.id(),
            Self::ResourceType(e) => e.id(),
            Self::DeploymentManager(e) => e.id(),
            Self::Location(e) => e.id(),
            Self::OCloudSite(e) => e.id(),
        }
    }
}

macro_rules! impl_from_entity {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_entity!(
    ResourcePool,
    Resource,
    ResourceType,
    DeploymentManager,
    Location,
    OCloudSite,
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entity_kind_round_trips_through_text() {
        assert_eq!(EntityKind::OCloudSite.to_string(), "OCloudSite");
        assert_eq!(
            EntityKind::from_str("DeploymentManager").unwrap(),
            EntityKind::DeploymentManager
        );
    }

    #[test]
    fn entity_reports_its_kind_and_id() {
        let id = Uuid::from_u128(7);
        let entity = Entity::from(ResourceType {
            resource_type_id: id,
            ..ResourceType::default()
        });
        assert_eq!(entity.kind(), EntityKind::ResourceType);
        assert_eq!(entity.id(), id);
    }
}
