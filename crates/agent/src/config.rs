//! Agent configuration
//!
//! Read once from the process environment at startup and validated before
//! any remote call is made.

use anyhow::Result;
use nodepool_lib::emitter::NEW_RELIC_METRIC_API;
use nodepool_lib::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-central1";

/// Raw settings as found in the environment
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSettings {
    /// Comma-separated project IDs (`GCP_PROJECT_IDS`)
    #[serde(default)]
    pub gcp_project_ids: Option<String>,

    /// Region shared by all projects (`GCP_REGION`)
    #[serde(default)]
    pub gcp_region: Option<String>,

    /// Static bearer token; metadata server is used when unset
    #[serde(default)]
    pub gcp_access_token: Option<String>,

    #[serde(default)]
    pub new_relic_api_key: Option<String>,

    #[serde(default = "default_metric_api_url")]
    pub new_relic_metric_api_url: String,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Run as a daemon, polling every N seconds
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    /// Health/metrics server port in daemon mode
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_metric_api_url() -> String {
    NEW_RELIC_METRIC_API.to_string()
}

fn default_retry_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY.as_secs()
}

fn default_api_port() -> u16 {
    8080
}

/// Just the project list, read ahead of the other settings
#[derive(Debug, Deserialize)]
struct ProjectSettings {
    #[serde(default)]
    gcp_project_ids: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No project IDs found. Set the GCP_PROJECT_IDS environment variable.")]
    NoProjectIds,

    #[error("NEW_RELIC_API_KEY is not set")]
    MissingApiKey,

    #[error("POLL_INTERVAL_SECS must be greater than zero")]
    ZeroInterval,
}

/// Validated agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Never empty; order preserved, duplicates kept
    pub project_ids: Vec<String>,
    pub region: String,
    /// None only in dry-run mode
    pub api_key: Option<String>,
    pub metric_api_url: String,
    pub access_token: Option<String>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub poll_interval: Option<Duration>,
    pub api_port: u16,
}

impl EnvSettings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    pub fn from_source(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Read only `GCP_PROJECT_IDS`. Malformed values in other settings do not
    /// affect the result.
    pub fn load_project_ids() -> Result<Vec<String>> {
        Self::project_ids_from_source(config::Environment::default())
    }

    pub fn project_ids_from_source(source: config::Environment) -> Result<Vec<String>> {
        let config = config::Config::builder().add_source(source).build()?;
        let settings: ProjectSettings = config.try_deserialize()?;
        Ok(settings
            .gcp_project_ids
            .as_deref()
            .map(parse_project_ids)
            .unwrap_or_default())
    }
}

/// Split a comma-separated project list, dropping blank entries
pub fn parse_project_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AgentConfig {
    /// Validate settings. The project list is checked first, so an empty
    /// list is reported even when other settings are also missing.
    pub fn from_settings(settings: EnvSettings, dry_run: bool) -> Result<Self, ConfigError> {
        let project_ids = settings
            .gcp_project_ids
            .as_deref()
            .map(parse_project_ids)
            .unwrap_or_default();
        if project_ids.is_empty() {
            return Err(ConfigError::NoProjectIds);
        }

        let api_key = non_empty(settings.new_relic_api_key);
        if api_key.is_none() && !dry_run {
            return Err(ConfigError::MissingApiKey);
        }

        if settings.poll_interval_secs == Some(0) {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            project_ids,
            region: non_empty(settings.gcp_region).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            api_key,
            metric_api_url: settings.new_relic_metric_api_url,
            access_token: non_empty(settings.gcp_access_token),
            retry_attempts: settings.retry_attempts,
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            poll_interval: settings.poll_interval_secs.map(Duration::from_secs),
            api_port: settings.api_port,
        })
    }
}
