//! Poll cycle orchestration
//!
//! Walks projects, clusters and node pools strictly in order. Each node pool
//! is resolved and its gauges emitted before moving on. The first error that
//! survives its retries aborts the rest of the cycle.

use crate::discovery::ClusterDiscovery;
use crate::emitter::{MetricSink, MetricsEmitter};
use crate::error::Result;
use crate::gcp::{ClusterManager, InstanceGroups};
use crate::instance_group::InstanceGroupCounter;
use crate::models::UtilizationRecord;
use crate::observability::{PollerMetrics, StructuredLogger};
use crate::resolver::NodePoolResolver;
use crate::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Where a poll cycle is in its traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Start,
    IteratingProjects,
    IteratingClusters,
    IteratingNodePools,
    Done,
    Aborted,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Start => "start",
            PollState::IteratingProjects => "projects",
            PollState::IteratingClusters => "clusters",
            PollState::IteratingNodePools => "node_pools",
            PollState::Done => "done",
            PollState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed poll cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSummary {
    pub projects: usize,
    pub clusters: usize,
    pub node_pools: usize,
    pub metrics_sent: usize,
    pub records: Vec<UtilizationRecord>,
}

/// Drives one project × cluster × node pool traversal
pub struct PollOrchestrator {
    discovery: ClusterDiscovery,
    resolver: NodePoolResolver,
    emitter: MetricsEmitter,
    region: String,
    logger: StructuredLogger,
    metrics: PollerMetrics,
    state: PollState,
}

impl PollOrchestrator {
    pub fn new(
        discovery: ClusterDiscovery,
        resolver: NodePoolResolver,
        emitter: MetricsEmitter,
        region: impl Into<String>,
    ) -> Self {
        let region = region.into();
        Self {
            discovery,
            resolver,
            emitter,
            logger: StructuredLogger::new(region.clone()),
            region,
            metrics: PollerMetrics::new(),
            state: PollState::Start,
        }
    }

    /// Wire every component from the remote clients, sharing one retry policy
    pub fn from_clients(
        clusters: Arc<dyn ClusterManager>,
        groups: Arc<dyn InstanceGroups>,
        sink: Arc<dyn MetricSink>,
        retry: RetryPolicy,
        region: impl Into<String>,
    ) -> Self {
        let counter = InstanceGroupCounter::new(groups, retry.clone());
        Self::new(
            ClusterDiscovery::new(clusters.clone(), retry.clone()),
            NodePoolResolver::new(clusters, counter, retry.clone()),
            MetricsEmitter::new(sink, retry),
            region,
        )
    }

    /// State reached by the most recent cycle
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run one full poll cycle over `project_ids`
    pub async fn run(&mut self, project_ids: &[String]) -> Result<PollSummary> {
        let start = Instant::now();
        self.state = PollState::Start;
        self.metrics.inc_poll_cycles();
        self.logger.log_poll_started(project_ids.len());

        let result = self.traverse(project_ids).await;
        self.metrics
            .observe_poll_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(summary) => {
                self.state = PollState::Done;
                self.logger
                    .log_poll_completed(summary.node_pools, start.elapsed().as_millis());
                Ok(summary)
            }
            Err(e) => {
                let stage = self.state;
                self.state = PollState::Aborted;
                self.metrics.inc_poll_failures();
                self.logger.log_poll_aborted(&stage.to_string(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn traverse(&mut self, project_ids: &[String]) -> Result<PollSummary> {
        let mut summary = PollSummary::default();

        for project_id in project_ids {
            self.state = PollState::IteratingProjects;
            let inventory = self
                .discovery
                .list_clusters_and_node_pools(project_id, &self.region)
                .await?;
            summary.projects += 1;
            self.logger.log_project(project_id, inventory.len());

            for cluster in &inventory {
                self.state = PollState::IteratingClusters;
                summary.clusters += 1;
                self.logger.log_cluster(
                    project_id,
                    &cluster.cluster_name,
                    cluster.node_pools.len(),
                );

                for node_pool_name in &cluster.node_pools {
                    self.state = PollState::IteratingNodePools;
                    let usage = self
                        .resolver
                        .get_node_pool_info(
                            project_id,
                            &self.region,
                            &cluster.cluster_name,
                            node_pool_name,
                        )
                        .await?;

                    let record = UtilizationRecord::new(
                        project_id,
                        &self.region,
                        &cluster.cluster_name,
                        node_pool_name,
                        usage,
                    );
                    self.logger.log_node_pool_usage(&record);
                    self.metrics.inc_node_pools_reported();

                    let sent = self.emitter.emit(&record).await?;
                    self.logger.log_metrics_sent(&record, sent);

                    summary.node_pools += 1;
                    summary.metrics_sent += sent;
                    summary.records.push(record);
                }
            }
        }

        Ok(summary)
    }
}
