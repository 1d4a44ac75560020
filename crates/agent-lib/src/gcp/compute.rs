//! REST client for Compute Engine instance groups

use super::{AccessTokenProvider, InstanceGroups};
use crate::error::Result;
use crate::http;
use crate::models::InstanceGroupRef;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Largest page the API will return
const PAGE_SIZE: &str = "500";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInstancesResponse {
    #[serde(default)]
    items: Vec<InstanceWithNamedPorts>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceWithNamedPorts {
    #[serde(default)]
    instance: String,
}

/// Compute Engine instance groups over REST
pub struct ComputeClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<AccessTokenProvider>,
}

impl ComputeClient {
    pub fn new(client: reqwest::Client, tokens: Arc<AccessTokenProvider>) -> Self {
        Self {
            client,
            base_url: COMPUTE_API_BASE.to_string(),
            tokens,
        }
    }

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
}

#[async_trait]
impl InstanceGroups for ComputeClient {
    async fn list_instances(&self, group: &InstanceGroupRef) -> Result<Vec<String>> {
        let url = http::join_path(
            &self.base_url,
            [
                "projects",
                group.project.as_str(),
                "zones",
                group.zone.as_str(),
                "instanceGroups",
                group.group.as_str(),
                "listInstances",
            ],
        )?;

        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.tokens.token().await?;
            let mut request = self
                .client
                .post(&url)
                .bearer_auth(token)
                .query(&[("maxResults", PAGE_SIZE)])
                .json(&serde_json::json!({}));
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page)]);
            }

            let page: ListInstancesResponse = http::send_json("compute", &url, request).await?;
            instances.extend(page.items.into_iter().map(|i| i.instance));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(
            group = %group.group,
            zone = %group.zone,
            instances = instances.len(),
            "Listed instance group members"
        );

        Ok(instances)
    }
}
