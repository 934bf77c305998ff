// ── Cluster data source ──
//
// Managed clusters registered with the hub become deployment managers.
// The source either watches the hub or, when watching is disabled, is
// polled on every collection cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use invsync_api::kube::{HubClient, ManagedCluster, find_condition};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::watch::{ConvertContext, ForwardingHandler, spawn_watch};
use super::{DataSource, DeploymentManagerDataSource, SourceState, WatchableDataSource};
use crate::error::CoreError;
use crate::event::AsyncEventType;
use crate::model::{DeploymentManager, Entity, EntityKind, Extensions};

pub const CLUSTER_SOURCE_NAME: &str = "K8S";

const AVAILABLE_CONDITION: &str = "ManagedClusterConditionAvailable";
const CLUSTER_ID_LABEL: &str = "clusterID";
const TEMPLATE_ID_LABEL: &str = "clustertemplates.clcm.openshift.io/templateId";
const ARTIFACT_RESOURCE_ID: &str = "artifactResourceId";

/// Allocatable quantities copied into `capacity_info`.
const CAPACITY_TAGS: [&str; 6] = [
    "cpu",
    "ephemeral-storage",
    "hugepages-1Gi",
    "hugepages-2Mi",
    "memory",
    "pods",
];

pub struct ClusterDataSource {
    hub: HubClient,
    cloud_id: Uuid,
    watch: bool,
    state: Arc<SourceState>,
}

impl ClusterDataSource {
    pub fn new(hub: HubClient, cloud_id: Uuid, watch: bool) -> Self {
        Self {
            hub,
            cloud_id,
            watch,
            state: SourceState::new(),
        }
    }

    fn context(&self) -> ConvertContext {
        ConvertContext {
            cloud_id: self.cloud_id,
            global_cloud_id: Uuid::nil(),
            data_source_id: self.state.id(),
            generation_id: self.state.generation(),
        }
    }
}

impl DataSource for ClusterDataSource {
    fn name(&self) -> &str {
        CLUSTER_SOURCE_NAME
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn as_deployment_manager_source(&self) -> Option<&dyn DeploymentManagerDataSource> {
        (!self.watch).then_some(self as &dyn DeploymentManagerDataSource)
    }

    fn as_watchable(&self) -> Option<&dyn WatchableDataSource> {
        self.watch.then_some(self as &dyn WatchableDataSource)
    }
}

#[async_trait]
impl DeploymentManagerDataSource for ClusterDataSource {
    async fn deployment_managers(&self) -> Result<Vec<DeploymentManager>, CoreError> {
        let listing = self.hub.list::<ManagedCluster>().await?;
        let ctx = self.context();

        let mut managers = Vec::with_capacity(listing.items.len());
        for cluster in &listing.items {
            match convert_cluster(cluster, AsyncEventType::Updated, &ctx) {
                Ok(Some(Entity::DeploymentManager(dm))) => managers.push(dm),
                Ok(_) => {}
                Err(e) => warn!(cluster = %cluster.metadata.name, error = %e, "skipping cluster"),
            }
        }
        debug!(count = managers.len(), "listed deployment managers");
        Ok(managers)
    }
}

impl WatchableDataSource for ClusterDataSource {
    fn watch(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let handler = ForwardingHandler {
            state: Arc::clone(&self.state),
            source_name: CLUSTER_SOURCE_NAME.to_owned(),
            kind: EntityKind::DeploymentManager,
            cloud_id: self.cloud_id,
            global_cloud_id: Uuid::nil(),
            convert: convert_cluster,
        };
        Ok(spawn_watch(
            "cluster-reflector",
            self.hub.clone(),
            handler,
            cancel,
        ))
    }
}

/// Converts a managed cluster into a deployment manager.
///
/// Unavailable clusters and clusters not provisioned from a template are
/// filtered out, except on deletion.
pub(crate) fn convert_cluster(
    cluster: &ManagedCluster,
    event_type: AsyncEventType,
    ctx: &ConvertContext,
) -> Result<Option<Entity>, CoreError> {
    let name = &cluster.metadata.name;
    let labels = &cluster.metadata.labels;

    if event_type != AsyncEventType::Deleted {
        let available = find_condition(&cluster.status.conditions, AVAILABLE_CONDITION);
        if available.is_none_or(|c| c.status.eq_ignore_ascii_case("false")) {
            debug!(cluster = %name, "cluster not available; ignoring");
            return Ok(None);
        }
        if !labels.contains_key(TEMPLATE_ID_LABEL) {
            debug!(cluster = %name, "cluster has no template label; ignoring");
            return Ok(None);
        }
    }

    let cluster_id = labels
        .get(CLUSTER_ID_LABEL)
        .ok_or_else(|| CoreError::conversion("ManagedCluster", name, "missing clusterID label"))?;
    let deployment_manager_id = Uuid::parse_str(cluster_id).map_err(|e| {
        CoreError::conversion(
            "ManagedCluster",
            name,
            format!("invalid clusterID '{cluster_id}': {e}"),
        )
    })?;

    let url = cluster
        .spec
        .managed_cluster_client_configs
        .iter()
        .map(|config| config.url.as_str())
        .find(|url| !url.is_empty())
        .ok_or_else(|| CoreError::conversion("ManagedCluster", name, "no client URL"))?;

    let extensions: Option<Extensions> = labels.get(TEMPLATE_ID_LABEL).map(|template| {
        [(
            ARTIFACT_RESOURCE_ID.to_owned(),
            serde_json::Value::String(template.clone()),
        )]
        .into_iter()
        .collect()
    });

    let capacity_info: BTreeMap<String, String> = CAPACITY_TAGS
        .iter()
        .filter_map(|tag| {
            cluster
                .status
                .allocatable
                .get(*tag)
                .map(|value| ((*tag).to_owned(), value.clone()))
        })
        .collect();

    Ok(Some(Entity::DeploymentManager(DeploymentManager {
        deployment_manager_id,
        name: name.clone(),
        description: name.clone(),
        o_cloud_id: ctx.cloud_id,
        url: url.to_owned(),
        locations: Vec::new(),
        capabilities: BTreeMap::new(),
        capacity_info,
        extensions,
        data_source_id: ctx.data_source_id,
        generation_id: ctx.generation_id,
        external_id: String::new(),
        created_at: None,
    })))
}
