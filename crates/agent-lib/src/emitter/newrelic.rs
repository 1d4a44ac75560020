//! New Relic Metric API sink

use super::{GaugeMetric, MetricSink};
use crate::error::Result;
use crate::http;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const NEW_RELIC_METRIC_API: &str = "https://metric-api.newrelic.com/metric/v1";

#[derive(Debug, Serialize)]
struct MetricBatch<'a> {
    metrics: Vec<NewRelicGauge<'a>>,
}

#[derive(Debug, Serialize)]
struct NewRelicGauge<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    value: f64,
    timestamp: i64,
    attributes: &'a BTreeMap<String, String>,
}

/// Pushes gauge batches to the New Relic Metric API
pub struct NewRelicSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl NewRelicSink {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: NEW_RELIC_METRIC_API.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Use a different ingest endpoint (EU region, proxies, tests)
    pub fn with_endpoint(
        client: reqwest::Client,
        endpoint: &str,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: http::normalize_base_url(endpoint)?,
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetricSink for NewRelicSink {
    async fn send_batch(&self, metrics: &[GaugeMetric]) -> Result<()> {
        let payload = [MetricBatch {
            metrics: metrics
                .iter()
                .map(|m| NewRelicGauge {
                    name: &m.name,
                    kind: "gauge",
                    value: m.value,
                    timestamp: m.timestamp,
                    attributes: &m.attributes,
                })
                .collect(),
        }];

        let request = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&payload);

        let response = http::send("newrelic", &self.endpoint, request).await?;
        debug!(
            status = response.status().as_u16(),
            metrics = metrics.len(),
            "Metric batch accepted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::build_gauges;
    use crate::error::PollError;
    use crate::models::{NodePoolUsage, UtilizationRecord};
    use mockito::Matcher;

    fn gauges() -> Vec<GaugeMetric> {
        let record = UtilizationRecord::new(
            "p1",
            "us-central1",
            "c1",
            "np1",
            NodePoolUsage::compute(7, 10),
        );
        build_gauges(&record, 1_700_000_000_000)
    }

    fn sink_for(server: &mockito::ServerGuard) -> NewRelicSink {
        NewRelicSink::with_endpoint(
            http::build_client().unwrap(),
            &format!("{}/metric/v1", server.url()),
            "NRAK-test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_batch_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/metric/v1")
            .match_header("Api-Key", "NRAK-test")
            .match_body(Matcher::PartialJson(serde_json::json!([{
                "metrics": [
                    {
                        "name": "gke.node_pool.current_node_count",
                        "type": "gauge",
                        "value": 7.0,
                        "timestamp": 1_700_000_000_000i64,
                        "attributes": {
                            "project_id": "p1",
                            "region": "us-central1",
                            "cluster_name": "c1",
                            "node_pool_name": "np1"
                        }
                    },
                    {"name": "gke.node_pool.max_node_count", "value": 10.0},
                    {"name": "gke.node_pool.node_usage_percent", "value": 70.0}
                ]
            }])))
            .with_status(202)
            .with_body(r#"{"requestId":"abc"}"#)
            .create_async()
            .await;

        sink_for(&server).send_batch(&gauges()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/metric/v1")
            .with_status(403)
            .with_body("invalid license key")
            .create_async()
            .await;

        let err = sink_for(&server).send_batch(&gauges()).await.unwrap_err();
        assert!(matches!(err, PollError::Status { status: 403, .. }));
        assert!(err.is_retryable());
    }
}
