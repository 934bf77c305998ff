// Wire types shared by every hub resource: metadata, list envelopes,
// watch events, and the API status object.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed hub resource addressable through the list/watch API.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// API group; empty for the core group.
    const GROUP: &'static str;
    const VERSION: &'static str;
    /// Lowercase plural used in the collection path.
    const PLURAL: &'static str;
    const KIND: &'static str;
    const NAMESPACED: bool;

    fn metadata(&self) -> &ObjectMeta;

    /// `api/{version}` for the core group, `apis/{group}/{version}` otherwise.
    fn api_prefix() -> String {
        if Self::GROUP.is_empty() {
            format!("api/{}", Self::VERSION)
        } else {
            format!("apis/{}/{}", Self::GROUP, Self::VERSION)
        }
    }
}

/// Standard object metadata (the subset the collectors read).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// List metadata: the collection version and pagination token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

/// A page of objects returned by a list call.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "K: DeserializeOwned"))]
pub struct ObjectList<K> {
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<K>,
}

/// A complete listing with the collection version to watch from.
#[derive(Debug, Clone)]
pub struct Listing<K> {
    pub items: Vec<K>,
    pub resource_version: String,
}

/// One frame of a watch stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "type",
    content = "object",
    bound(deserialize = "K: DeserializeOwned")
)]
pub enum WatchEvent<K> {
    #[serde(rename = "ADDED")]
    Added(K),
    #[serde(rename = "MODIFIED")]
    Modified(K),
    #[serde(rename = "DELETED")]
    Deleted(K),
    #[serde(rename = "BOOKMARK")]
    Bookmark(Bookmark),
    #[serde(rename = "ERROR")]
    Error(Status),
}

/// Bookmark payload: only the metadata carries meaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bookmark {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// API status object, returned on failed requests and `ERROR` watch events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// A status condition as reported by controllers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status.eq_ignore_ascii_case("true")
    }
}

/// Find a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
