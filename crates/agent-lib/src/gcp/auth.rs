//! OAuth access tokens for GCP REST calls
//!
//! Tokens come either from a fixed value (e.g. `gcloud auth print-access-token`)
//! or from the GCE/GKE metadata server of the workload's service account.

use crate::error::{PollError, Result};
use crate::http;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default metadata server token endpoint
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh tokens this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

enum TokenSource {
    Fixed(String),
    MetadataServer { client: reqwest::Client, url: String },
}

/// Supplies bearer tokens, caching metadata server tokens until near expiry
pub struct AccessTokenProvider {
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    /// Always hand out the same token
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Fixed(token.into()),
            cached: Mutex::new(None),
        }
    }

    /// Fetch tokens from the default metadata server endpoint
    pub fn metadata_server(client: reqwest::Client) -> Self {
        Self::metadata_server_at(client, METADATA_TOKEN_URL)
    }

    pub fn metadata_server_at(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            source: TokenSource::MetadataServer {
                client,
                url: url.into(),
            },
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token
    pub async fn token(&self) -> Result<String> {
        let (client, url) = match &self.source {
            TokenSource::Fixed(token) => return Ok(token.clone()),
            TokenSource::MetadataServer { client, url } => (client, url),
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let request = client.get(url).header("Metadata-Flavor", "Google");
        let fetched: MetadataToken = http::send_json("metadata", url, request)
            .await
            .map_err(|e| PollError::Auth(e.to_string()))?;

        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(
            expires_in_secs = fetched.expires_in,
            "Fetched access token from metadata server"
        );

        *cached = Some(CachedToken {
            value: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(fetched.access_token)
    }
}
