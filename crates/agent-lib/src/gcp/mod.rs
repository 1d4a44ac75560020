//! Google Cloud collaborators
//!
//! Read-only access to the GKE cluster manager and Compute Engine instance
//! groups. Both are expressed as traits so the pipeline can run against the
//! REST clients in production and against in-memory fakes in tests.

mod auth;
mod compute;
mod container;

pub use auth::{AccessTokenProvider, METADATA_TOKEN_URL};
pub use compute::{ComputeClient, COMPUTE_API_BASE};
pub use container::{GkeClient, CONTAINER_API_BASE};

use crate::error::Result;
use crate::models::{Cluster, InstanceGroupRef, NodePool};
use async_trait::async_trait;

/// GKE cluster manager operations used by the poller
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// List clusters under `projects/{p}/locations/{r}`
    async fn list_clusters(&self, parent: &str) -> Result<Vec<Cluster>>;

    /// List node pool names under `projects/{p}/locations/{r}/clusters/{c}`
    async fn list_node_pools(&self, parent: &str) -> Result<Vec<String>>;

    /// Fetch a node pool by its fully qualified name
    async fn get_node_pool(&self, name: &str) -> Result<NodePool>;
}

/// Compute Engine instance group operations used by the poller
#[async_trait]
pub trait InstanceGroups: Send + Sync {
    /// List the instances that belong to a group (instance URLs)
    async fn list_instances(&self, group: &InstanceGroupRef) -> Result<Vec<String>>;
}

pub fn location_path(project_id: &str, region: &str) -> String {
    format!("projects/{}/locations/{}", project_id, region)
}

pub fn cluster_path(project_id: &str, region: &str, cluster_name: &str) -> String {
    format!("{}/clusters/{}", location_path(project_id, region), cluster_name)
}

pub fn node_pool_path(
    project_id: &str,
    region: &str,
    cluster_name: &str,
    node_pool_name: &str,
) -> String {
    format!(
        "{}/nodePools/{}",
        cluster_path(project_id, region, cluster_name),
        node_pool_name
    )
}
