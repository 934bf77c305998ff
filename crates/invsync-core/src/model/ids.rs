//! Deterministic identifiers for canonical entities.
//!
//! Every entity discovered from a backend gets a name-based (SHA-1) UUID
//! derived from a per-kind namespace, the owning cloud, and the entity's
//! natural keys. Rediscovering the same object after a restart or relist
//! therefore resolves to the same row.

use uuid::Uuid;

/// Namespace for resource pool identifiers.
pub const RESOURCE_POOL_NAMESPACE: Uuid = Uuid::from_u128(0xdaee6434_767a_485d_816b_bc04c21f1acf);

/// Namespace for resource identifiers.
pub const RESOURCE_NAMESPACE: Uuid = Uuid::from_u128(0x8ef67482_1215_470d_9a43_eb02af4a7c05);

/// Namespace for resource type identifiers.
pub const RESOURCE_TYPE_NAMESPACE: Uuid = Uuid::from_u128(0x255c4b4c_84a8_4c95_95ba_217e1688a03d);

/// Namespace for cloud site identifiers.
pub const OCLOUD_SITE_NAMESPACE: Uuid = Uuid::from_u128(0xa1b2c3d4_e5f6_4a5b_8c9d_0e1f2a3b4c5d);

/// Namespace for location identifiers.
pub const LOCATION_NAMESPACE: Uuid = Uuid::from_u128(0x3f0c9e52_6b1d_4d7a_a2c4_58e91b7f0d36);

/// `uuid_v5(namespace, "{cloud_id}/{name_1}/.../{name_n}")`
pub fn make_uuid_from_names(namespace: Uuid, cloud_id: Uuid, names: &[&str]) -> Uuid {
    let mut value = cloud_id.hyphenated().to_string();
    for name in names {
        value.push('/');
        value.push_str(name);
    }
    Uuid::new_v5(&namespace, value.as_bytes())
}
