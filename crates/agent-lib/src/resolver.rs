//! Node pool resolution: membership, ceiling and utilization

use crate::error::Result;
use crate::gcp::{node_pool_path, ClusterManager};
use crate::instance_group::InstanceGroupCounter;
use crate::models::NodePoolUsage;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::debug;

/// Resolves a node pool into its current utilization
pub struct NodePoolResolver {
    clusters: Arc<dyn ClusterManager>,
    counter: InstanceGroupCounter,
    retry: RetryPolicy,
}

impl NodePoolResolver {
    pub fn new(
        clusters: Arc<dyn ClusterManager>,
        counter: InstanceGroupCounter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            clusters,
            counter,
            retry,
        }
    }

    /// Fetch the node pool and sum live instances across its instance groups.
    ///
    /// The whole resolution is retried; each instance group count is also
    /// retried on its own.
    pub async fn get_node_pool_info(
        &self,
        project_id: &str,
        region: &str,
        cluster_name: &str,
        node_pool_name: &str,
    ) -> Result<NodePoolUsage> {
        let name = node_pool_path(project_id, region, cluster_name, node_pool_name);
        self.retry
            .run("get_node_pool_info", || self.resolve_once(&name))
            .await
    }

    async fn resolve_once(&self, name: &str) -> Result<NodePoolUsage> {
        let node_pool = self.clusters.get_node_pool(name).await?;

        let mut current_node_count = 0u64;
        for url in &node_pool.instance_group_urls {
            current_node_count += self.counter.count_instances(url).await?;
        }

        debug!(
            node_pool = %name,
            instance_groups = node_pool.instance_group_urls.len(),
            current_node_count = current_node_count,
            max_node_count = node_pool.max_node_count,
            "Resolved node pool"
        );

        Ok(NodePoolUsage::compute(
            current_node_count,
            node_pool.max_node_count,
        ))
    }
}
