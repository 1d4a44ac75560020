//! Core data models for the node pool poller

use crate::error::{PollError, Result};
use serde::{Deserialize, Serialize};

/// Number of slash-separated segments in a full instance group URL:
/// `https://www.googleapis.com/compute/v1/projects/{p}/zones/{z}/instanceGroupManagers/{g}`
const LOCATOR_SEGMENTS: usize = 11;
const PROJECT_SLOT: usize = 6;
const ZONE_SLOT: usize = 8;
const GROUP_SLOT: usize = 10;

/// A cluster as returned by the list clusters call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
}

/// Node pool details needed to compute utilization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePool {
    pub name: String,
    pub instance_group_urls: Vec<String>,
    /// Autoscaling ceiling, 0 when autoscaling is disabled
    pub max_node_count: u32,
}

/// Node pools of one cluster, in API return order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNodePools {
    pub cluster_name: String,
    pub node_pools: Vec<String>,
}

/// Clusters of one project/region, in API return order
pub type ClusterInventory = Vec<ClusterNodePools>;

/// Decomposed instance group locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceGroupRef {
    pub project: String,
    pub zone: String,
    pub group: String,
}

impl InstanceGroupRef {
    /// Parse a full instance group URL by fixed positional slots
    pub fn parse(locator: &str) -> Result<Self> {
        let parts: Vec<&str> = locator.split('/').collect();

        if parts.len() != LOCATOR_SEGMENTS {
            return Err(PollError::MalformedLocator {
                locator: locator.to_string(),
                reason: format!(
                    "expected {} segments, found {}",
                    LOCATOR_SEGMENTS,
                    parts.len()
                ),
            });
        }

        let slot = |index: usize, what: &str| -> Result<String> {
            let value = parts[index];
            if value.is_empty() {
                return Err(PollError::MalformedLocator {
                    locator: locator.to_string(),
                    reason: format!("empty {} segment", what),
                });
            }
            Ok(value.to_string())
        };

        Ok(Self {
            project: slot(PROJECT_SLOT, "project")?,
            zone: slot(ZONE_SLOT, "zone")?,
            group: slot(GROUP_SLOT, "instance group")?,
        })
    }
}

/// Utilization figures for one node pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePoolUsage {
    pub current_node_count: u64,
    pub max_node_count: u32,
    pub usage_percent: f64,
}

/// Utilization of one node pool with its identifying tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRecord {
    pub project_id: String,
    pub region: String,
    pub cluster_name: String,
    pub node_pool_name: String,
    pub current_node_count: u64,
    pub max_node_count: u32,
    pub usage_percent: f64,
}

impl UtilizationRecord {
    pub fn new(
        project_id: &str,
        region: &str,
        cluster_name: &str,
        node_pool_name: &str,
        usage: NodePoolUsage,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            region: region.to_string(),
            cluster_name: cluster_name.to_string(),
            node_pool_name: node_pool_name.to_string(),
            current_node_count: usage.current_node_count,
            max_node_count: usage.max_node_count,
            usage_percent: usage.usage_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instance_group_url() {
        let parsed = InstanceGroupRef::parse(
            "https://www.googleapis.com/compute/v1/projects/p1/zones/us-central1-a/instanceGroupManagers/gke-c1-np1-1234-grp",
        )
        .unwrap();

        assert_eq!(parsed.project, "p1");
        assert_eq!(parsed.zone, "us-central1-a");
        assert_eq!(parsed.group, "gke-c1-np1-1234-grp");
    }

    #[test]
    fn test_parse_rejects_short_locator() {
        let err = InstanceGroupRef::parse("projects/p1/zones/us-central1-a/instanceGroups/g")
            .unwrap_err();
        assert!(matches!(err, PollError::MalformedLocator { .. }));
        assert!(err.to_string().contains("expected 11 segments, found 6"));
    }

    #[test]
    fn test_parse_rejects_trailing_slash() {
        let err = InstanceGroupRef::parse(
            "https://www.googleapis.com/compute/v1/projects/p1/zones/z/instanceGroupManagers/g/",
        )
        .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_empty_slot() {
        let err = InstanceGroupRef::parse(
            "https://www.googleapis.com/compute/v1/projects//zones/z/instanceGroupManagers/g",
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty project segment"));
    }
}
