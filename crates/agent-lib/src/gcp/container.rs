//! REST client for the GKE (container.googleapis.com) v1 API

use super::{AccessTokenProvider, ClusterManager};
use crate::error::Result;
use crate::http;
use crate::models::{Cluster, NodePool};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const CONTAINER_API_BASE: &str = "https://container.googleapis.com/v1";

#[derive(Debug, Deserialize)]
struct ListClustersResponse {
    #[serde(default)]
    clusters: Vec<ClusterResource>,
}

#[derive(Debug, Deserialize)]
struct ClusterResource {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNodePoolsResponse {
    #[serde(default)]
    node_pools: Vec<NodePoolResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePoolResource {
    name: String,
    #[serde(default)]
    instance_group_urls: Vec<String>,
    #[serde(default)]
    autoscaling: Option<NodePoolAutoscaling>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePoolAutoscaling {
    #[serde(default)]
    max_node_count: u32,
}

impl From<NodePoolResource> for NodePool {
    fn from(resource: NodePoolResource) -> Self {
        NodePool {
            name: resource.name,
            instance_group_urls: resource.instance_group_urls,
            max_node_count: resource
                .autoscaling
                .map(|a| a.max_node_count)
                .unwrap_or(0),
        }
    }
}

/// GKE cluster manager over REST
pub struct GkeClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<AccessTokenProvider>,
}

impl GkeClient {
    pub fn new(client: reqwest::Client, tokens: Arc<AccessTokenProvider>) -> Self {
        Self {
            client,
            base_url: CONTAINER_API_BASE.to_string(),
            tokens,
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        tokens: Arc<AccessTokenProvider>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            base_url: http::normalize_base_url(base_url)?,
            tokens,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let url = http::join_path(&self.base_url, resource.split('/'))?;
        let token = self.tokens.token().await?;
        debug!(url = %url, "GKE API request");

        let request = self.client.get(&url).bearer_auth(token);
        http::send_json("container", &url, request).await
    }
}

#[async_trait]
impl ClusterManager for GkeClient {
    async fn list_clusters(&self, parent: &str) -> Result<Vec<Cluster>> {
        let response: ListClustersResponse = self.get(&format!("{}/clusters", parent)).await?;
        Ok(response
            .clusters
            .into_iter()
            .map(|c| Cluster { name: c.name })
            .collect())
    }

    async fn list_node_pools(&self, parent: &str) -> Result<Vec<String>> {
        let response: ListNodePoolsResponse = self.get(&format!("{}/nodePools", parent)).await?;
        Ok(response.node_pools.into_iter().map(|np| np.name).collect())
    }

    async fn get_node_pool(&self, name: &str) -> Result<NodePool> {
        let resource: NodePoolResource = self.get(name).await?;
        Ok(resource.into())
    }
}
