//! Shared request/response handling for the REST collaborators

use crate::error::{PollError, Result};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-request timeout applied to every outbound client
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by the REST collaborators
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("nodepool-monitor/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PollError::Remote(format!("failed to create HTTP client: {}", e)))
}

/// Send a request and fail on transport errors or non-2xx statuses
pub async fn send(service: &'static str, url: &str, request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|source| PollError::Transport {
        url: url.to_string(),
        source,
    })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(PollError::Status {
            service,
            url: url.to_string(),
            status,
            body,
        });
    }

    Ok(response)
}

/// Send a request and decode a JSON body
pub async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    url: &str,
    request: RequestBuilder,
) -> Result<T> {
    send(service, url, request)
        .await?
        .json()
        .await
        .map_err(|source| PollError::Decode {
            url: url.to_string(),
            source,
        })
}

/// Normalize a configured base URL: must parse, trailing slash dropped
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    url::Url::parse(base_url)
        .map_err(|e| PollError::Remote(format!("invalid base URL {}: {}", base_url, e)))?;
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Append path segments to a base URL, percent-encoding each one
pub fn join_path<'a>(
    base_url: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<String> {
    let mut url = url::Url::parse(base_url)
        .map_err(|e| PollError::Remote(format!("invalid base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| PollError::Remote(format!("base URL {} cannot take a path", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://container.googleapis.com/v1/").unwrap(),
            "https://container.googleapis.com/v1"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_join_path_encodes_segments() {
        assert_eq!(
            join_path("https://container.googleapis.com/v1", ["projects", "p1"]).unwrap(),
            "https://container.googleapis.com/v1/projects/p1"
        );
        assert_eq!(
            join_path("http://127.0.0.1:1234", ["clusters", "c 1?x#y", "a/b"]).unwrap(),
            "http://127.0.0.1:1234/clusters/c%201%3Fx%23y/a%2Fb"
        );
        assert!(join_path("mailto:ops@example.com", ["x"]).is_err());
    }

    #[tokio::test]
    async fn test_send_reports_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/thing")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = build_client().unwrap();
        let url = format!("{}/thing", server.url());
        let err = send("container", &url, client.get(&url)).await.unwrap_err();

        mock.assert_async().await;
        match err {
            PollError::Status { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
