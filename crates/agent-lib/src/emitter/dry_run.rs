//! Sink that only logs gauges, used for dry runs

use super::{GaugeMetric, MetricSink};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl MetricSink for LoggingSink {
    async fn send_batch(&self, metrics: &[GaugeMetric]) -> Result<()> {
        for metric in metrics {
            info!(
                event = "dry_run_gauge",
                metric = %metric.name,
                value = metric.value,
                attributes = ?metric.attributes,
                "Gauge not sent (dry run)"
            );
        }
        Ok(())
    }
}
