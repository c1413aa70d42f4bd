//! HTTP client for the Proxmox VE API.

use super::{ApiToken, Upstream, UpstreamError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the API, e.g. `https://pve.example.com:8006`.
    pub endpoint: String,
    /// Credentials sent with every request.
    pub token: ApiToken,
    /// Node whose VMs and storage are listed.
    pub node: String,
    /// Per-request timeout, covering connect and body read.
    pub timeout: Duration,
    /// Accept any server certificate.
    ///
    /// Proxmox installs ship with a self-signed certificate, so this is
    /// commonly needed, but it disables server authentication entirely.
    pub insecure_skip_verify: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: ApiToken::default(),
            node: "localhost".to_string(),
            timeout: Duration::from_secs(10),
            insecure_skip_verify: false,
        }
    }
}

/// [`Upstream`] implementation backed by a pooled `reqwest` client.
///
/// The client is cheap to share: clones and concurrent requests reuse the
/// same connection pool.
#[derive(Debug, Clone)]
pub struct PveClient {
    http: reqwest::Client,
    base_url: String,
}

impl PveClient {
    /// Builds a client for the given configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut authorization = HeaderValue::from_str(&config.token.header_value())?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        if config.insecure_skip_verify {
            tracing::warn!(
                endpoint = %config.endpoint,
                "TLS certificate verification is disabled for the upstream API"
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .timeout(config.timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            http,
            base_url: format!("{}/api2/json", config.endpoint.trim_end_matches('/')),
        })
    }

    /// Full URL for a path relative to `/api2/json`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Upstream for PveClient {
    async fn get(&self, path: &str) -> Result<Bytes, UpstreamError> {
        let url = self.url(path);
        tracing::trace!(%url, "querying upstream");

        let transport = |source: reqwest::Error| UpstreamError::Transport {
            path: path.to_string(),
            source,
        };

        let response = self.http.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                path: path.to_string(),
                status,
            });
        }

        response.bytes().await.map_err(transport)
    }
}
