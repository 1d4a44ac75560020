//! Gauge emission for node pool utilization
//!
//! Each utilization record becomes three tagged gauges that are pushed to a
//! [`MetricSink`] as a single batch.

mod dry_run;
mod newrelic;

pub use dry_run::LoggingSink;
pub use newrelic::{NewRelicSink, NEW_RELIC_METRIC_API};

use crate::error::Result;
use crate::models::UtilizationRecord;
use crate::observability::PollerMetrics;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CURRENT_NODE_COUNT: &str = "gke.node_pool.current_node_count";
pub const MAX_NODE_COUNT: &str = "gke.node_pool.max_node_count";
pub const NODE_USAGE_PERCENT: &str = "gke.node_pool.node_usage_percent";

/// A point-in-time measurement with attached tags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeMetric {
    pub name: String,
    pub value: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub attributes: BTreeMap<String, String>,
}

/// Destination for gauge batches
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Deliver one batch; any non-success answer is an error
    async fn send_batch(&self, metrics: &[GaugeMetric]) -> Result<()>;
}

/// Tags shared by every gauge of one node pool
pub fn node_pool_tags(record: &UtilizationRecord) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("project_id".to_string(), record.project_id.clone()),
        ("region".to_string(), record.region.clone()),
        ("cluster_name".to_string(), record.cluster_name.clone()),
        ("node_pool_name".to_string(), record.node_pool_name.clone()),
    ])
}

/// The three gauges describing one node pool
pub fn build_gauges(record: &UtilizationRecord, timestamp: i64) -> Vec<GaugeMetric> {
    let tags = node_pool_tags(record);
    let gauge = |name: &str, value: f64| GaugeMetric {
        name: name.to_string(),
        value,
        timestamp,
        attributes: tags.clone(),
    };

    vec![
        gauge(CURRENT_NODE_COUNT, record.current_node_count as f64),
        gauge(MAX_NODE_COUNT, record.max_node_count as f64),
        gauge(NODE_USAGE_PERCENT, record.usage_percent),
    ]
}

/// Pushes utilization records to a sink with retry
pub struct MetricsEmitter {
    sink: Arc<dyn MetricSink>,
    retry: RetryPolicy,
    metrics: PollerMetrics,
}

impl MetricsEmitter {
    pub fn new(sink: Arc<dyn MetricSink>, retry: RetryPolicy) -> Self {
        Self {
            sink,
            retry,
            metrics: PollerMetrics::new(),
        }
    }

    /// Send the gauges for one node pool; returns how many were sent
    pub async fn emit(&self, record: &UtilizationRecord) -> Result<usize> {
        let gauges = build_gauges(record, chrono::Utc::now().timestamp_millis());

        self.retry
            .run("send_metrics", || self.sink.send_batch(&gauges))
            .await?;

        self.metrics.inc_metric_batches_sent();
        Ok(gauges.len())
    }
}
