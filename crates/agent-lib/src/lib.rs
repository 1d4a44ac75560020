//! Node pool utilization poller
//!
//! This crate provides the polling pipeline:
//! - Cluster and node pool discovery through the GKE API
//! - Instance group membership counts through Compute Engine
//! - Utilization computation and gauge emission to New Relic
//! - Fixed-delay retry around every remote call
//! - Health tracking and self-observability for daemon mode

pub mod discovery;
pub mod emitter;
pub mod error;
pub mod gcp;
pub mod health;
pub mod http;
pub mod instance_group;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod utilization;

pub use error::{PollError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PollerMetrics, StructuredLogger};
pub use orchestrator::{PollOrchestrator, PollState, PollSummary};
pub use retry::RetryPolicy;
