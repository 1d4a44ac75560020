//! Health tracking for daemon mode
//!
//! Records the outcome of each poll cycle so the liveness and readiness
//! probes can report on the poller and the metrics sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Last cycle failed but the daemon keeps polling
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_timestamp: Option<i64>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const POLLER: &str = "poller";
    pub const METRICS_SINK: &str = "metrics_sink";
}

/// Consecutive failed cycles before the poller is reported unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Default)]
struct HealthState {
    components: HashMap<String, ComponentHealth>,
    last_success: Option<i64>,
    consecutive_failures: u32,
}

/// Shared poll health, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut state = self.state.write().await;
        state
            .components
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Record a completed poll cycle
    pub async fn record_success(&self, node_pools: usize) {
        let mut state = self.state.write().await;
        state.last_success = Some(chrono::Utc::now().timestamp());
        state.consecutive_failures = 0;
        for health in state.components.values_mut() {
            *health = ComponentHealth::with_status(
                ComponentStatus::Healthy,
                Some(format!("{} node pools reported", node_pools)),
            );
        }
    }

    /// Record an aborted poll cycle against `component`
    pub async fn record_failure(&self, component: &str, error: &str) {
        let mut state = self.state.write().await;
        state.consecutive_failures += 1;
        let health = if state.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentHealth::unhealthy(error)
        } else {
            ComponentHealth::degraded(error)
        };
        state.components.insert(component.to_string(), health);
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;

        let status = state
            .components
            .values()
            .map(|h| h.status)
            .fold(ComponentStatus::Healthy, |worst, s| match (worst, s) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            });

        HealthResponse {
            status,
            components: state.components.clone(),
            last_success_timestamp: state.last_success,
            consecutive_failures: state.consecutive_failures,
        }
    }

    /// Ready once a cycle has completed and nothing is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let health = self.health().await;

        if health.last_success_timestamp.is_none() {
            ReadinessResponse {
                ready: false,
                reason: Some("No poll cycle has completed yet".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Poll cycles are failing".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
