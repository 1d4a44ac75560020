//! Observability infrastructure for the node pool poller
//!
//! Provides:
//! - Prometheus metrics describing the poller itself (cycles, retries, latency)
//! - Structured JSON logging of poll events with tracing

use crate::models::UtilizationRecord;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Histogram buckets for poll cycle duration (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PollerMetricsInner> = OnceLock::new();

struct PollerMetricsInner {
    poll_cycles: IntCounter,
    poll_failures: IntCounter,
    poll_duration_seconds: Histogram,
    remote_call_retries: IntCounterVec,
    metric_batches_sent: IntCounter,
    node_pools_reported: IntCounter,
}

impl PollerMetricsInner {
    fn new() -> Self {
        Self {
            poll_cycles: register_int_counter!(
                "nodepool_poller_cycles_total",
                "Total number of poll cycles started"
            )
            .expect("Failed to register cycles_total"),

            poll_failures: register_int_counter!(
                "nodepool_poller_cycle_failures_total",
                "Total number of poll cycles aborted by an unrecovered error"
            )
            .expect("Failed to register cycle_failures_total"),

            poll_duration_seconds: register_histogram!(
                "nodepool_poller_cycle_duration_seconds",
                "Wall-clock duration of a poll cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            remote_call_retries: register_int_counter_vec!(
                "nodepool_poller_remote_call_retries_total",
                "Retries performed per remote operation",
                &["operation"]
            )
            .expect("Failed to register remote_call_retries_total"),

            metric_batches_sent: register_int_counter!(
                "nodepool_poller_metric_batches_sent_total",
                "Gauge batches accepted by the metrics sink"
            )
            .expect("Failed to register metric_batches_sent_total"),

            node_pools_reported: register_int_counter!(
                "nodepool_poller_node_pools_reported_total",
                "Node pools whose utilization was computed"
            )
            .expect("Failed to register node_pools_reported_total"),
        }
    }
}

/// Lightweight handle to the global poller metrics.
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PollerMetrics {
    _private: (),
}

impl Default for PollerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PollerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PollerMetricsInner {
        GLOBAL_METRICS.get_or_init(PollerMetricsInner::new)
    }

    pub fn inc_poll_cycles(&self) {
        self.inner().poll_cycles.inc();
    }

    pub fn inc_poll_failures(&self) {
        self.inner().poll_failures.inc();
    }

    pub fn observe_poll_duration(&self, duration_secs: f64) {
        self.inner().poll_duration_seconds.observe(duration_secs);
    }

    /// Count one retry of the named remote operation
    pub fn inc_retries(&self, operation: &str) {
        self.inner()
            .remote_call_retries
            .with_label_values(&[operation])
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn retries(&self, operation: &str) -> u64 {
        self.inner()
            .remote_call_retries
            .with_label_values(&[operation])
            .get()
    }

    pub fn inc_metric_batches_sent(&self) {
        self.inner().metric_batches_sent.inc();
    }

    pub fn inc_node_pools_reported(&self) {
        self.inner().node_pools_reported.inc();
    }
}

/// Structured logger for poll events
#[derive(Clone)]
pub struct StructuredLogger {
    region: String,
}

impl StructuredLogger {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn log_startup(&self, version: &str, projects: &[String]) {
        info!(
            event = "agent_started",
            region = %self.region,
            agent_version = %version,
            projects = ?projects,
            "Node pool monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            region = %self.region,
            reason = %reason,
            "Node pool monitor shutting down"
        );
    }

    pub fn log_poll_started(&self, project_count: usize) {
        info!(
            event = "poll_started",
            region = %self.region,
            projects = project_count,
            "Starting poll cycle"
        );
    }

    pub fn log_project(&self, project_id: &str, clusters: usize) {
        info!(
            event = "project_discovered",
            region = %self.region,
            project_id = %project_id,
            clusters = clusters,
            "Project"
        );
    }

    pub fn log_cluster(&self, project_id: &str, cluster_name: &str, node_pools: usize) {
        info!(
            event = "cluster_discovered",
            region = %self.region,
            project_id = %project_id,
            cluster_name = %cluster_name,
            node_pools = node_pools,
            "Cluster"
        );
    }

    /// Log the utilization of one node pool; the percentage is rounded for display only
    pub fn log_node_pool_usage(&self, record: &UtilizationRecord) {
        info!(
            event = "node_pool_usage",
            region = %self.region,
            project_id = %record.project_id,
            cluster_name = %record.cluster_name,
            node_pool_name = %record.node_pool_name,
            current_node_count = record.current_node_count,
            max_node_count = record.max_node_count,
            node_usage_percent = %format!("{:.2}", record.usage_percent),
            "Node pool utilization"
        );
    }

    pub fn log_metrics_sent(&self, record: &UtilizationRecord, gauges: usize) {
        info!(
            event = "metrics_sent",
            project_id = %record.project_id,
            cluster_name = %record.cluster_name,
            node_pool_name = %record.node_pool_name,
            gauges = gauges,
            "Sent metrics successfully"
        );
    }

    pub fn log_poll_completed(&self, node_pools: usize, elapsed_ms: u128) {
        info!(
            event = "poll_completed",
            region = %self.region,
            node_pools = node_pools,
            elapsed_ms = elapsed_ms,
            "Poll cycle complete"
        );
    }

    pub fn log_poll_aborted(&self, stage: &str, error: &str) {
        error!(
            event = "poll_aborted",
            region = %self.region,
            stage = %stage,
            error = %error,
            "Poll cycle aborted"
        );
    }
}
