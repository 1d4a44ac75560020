//! Cluster and node pool discovery for one project/region

use crate::error::Result;
use crate::gcp::{cluster_path, location_path, ClusterManager};
use crate::models::{ClusterInventory, ClusterNodePools};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::debug;

/// Lists clusters and their node pools
pub struct ClusterDiscovery {
    clusters: Arc<dyn ClusterManager>,
    retry: RetryPolicy,
}

impl ClusterDiscovery {
    pub fn new(clusters: Arc<dyn ClusterManager>, retry: RetryPolicy) -> Self {
        Self { clusters, retry }
    }

    /// List every cluster in the region with its node pool names, in API order.
    ///
    /// The listing is retried as a whole: a failure on any cluster's node
    /// pools restarts discovery from the cluster list.
    pub async fn list_clusters_and_node_pools(
        &self,
        project_id: &str,
        region: &str,
    ) -> Result<ClusterInventory> {
        self.retry
            .run("list_clusters_and_node_pools", || {
                self.list_once(project_id, region)
            })
            .await
    }

    async fn list_once(&self, project_id: &str, region: &str) -> Result<ClusterInventory> {
        let clusters = self
            .clusters
            .list_clusters(&location_path(project_id, region))
            .await?;

        let mut inventory = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let node_pools = self
                .clusters
                .list_node_pools(&cluster_path(project_id, region, &cluster.name))
                .await?;

            debug!(
                project_id = %project_id,
                cluster_name = %cluster.name,
                node_pools = node_pools.len(),
                "Discovered cluster"
            );

            inventory.push(ClusterNodePools {
                cluster_name: cluster.name,
                node_pools,
            });
        }

        Ok(inventory)
    }
}
