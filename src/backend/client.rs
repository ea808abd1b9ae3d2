//! HTTP client for the control-plane API.
//!
//! # Responsibilities
//! - POST ban expressions to the configured endpoint
//! - POST configuration updates to `<endpoint>/configuration`
//! - Bound every call by the configured timeout
//! - Map HTTP status and transport errors to `ForwardOutcome`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::time::timeout;
use url::Url;

use crate::backend::types::{
    BackendError, BanPayload, ForwardOutcome, ForwardRequest, VclUpdatePayload,
};
use crate::backend::ControlPlane;
use crate::config::ApiConfig;
use crate::observability::metrics;

/// Sent as `User-Agent` on every API call.
pub const USER_AGENT: &str = concat!("varnish-cli-bridge/", env!("CARGO_PKG_VERSION"));

/// `ControlPlane` backed by the HTTP API.
#[derive(Clone)]
pub struct HttpControlPlane {
    client: reqwest::Client,
    ban_url: Url,
    configuration_url: Url,
    username: String,
    password: String,
    personality: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for HttpControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpControlPlane")
            .field("ban_url", &self.ban_url.as_str())
            .field("configuration_url", &self.configuration_url.as_str())
            .field("username", &self.username)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl HttpControlPlane {
    /// Build a client for the configured endpoint.
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let ban_url = parse_endpoint(&config.endpoint)?;
        let configuration_url = configuration_url(&ban_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(BackendError::Client)?;

        tracing::info!(
            endpoint = %ban_url,
            username = %config.username,
            timeout_secs = config.timeout_secs,
            "Control-plane client initialized"
        );

        Ok(Self {
            client,
            ban_url,
            configuration_url,
            username: config.username.clone(),
            password: config.password.clone(),
            personality: config.personality.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn ban_url(&self) -> &Url {
        &self.ban_url
    }

    pub fn configuration_url(&self) -> &Url {
        &self.configuration_url
    }

    /// Send the request and return the HTTP status code.
    async fn post(&self, request: &ForwardRequest) -> Result<u16, BackendError> {
        let (url, body) = match request {
            ForwardRequest::Ban { proxy, expression } => {
                let payload = BanPayload {
                    proxy,
                    ban: expression,
                };
                (self.ban_url.clone(), serde_json::to_vec(&payload)?)
            }
            ForwardRequest::VclUpdate { name, content } => {
                let payload = VclUpdatePayload {
                    personality: &self.personality,
                    message: format!("Update from varnish-cli-bridge ({})", name),
                    content,
                };
                (self.configuration_url.clone(), serde_json::to_vec(&payload)?)
            }
        };

        tracing::debug!(url = %url, kind = request.kind(), "Posting to control plane");

        let send = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();

        let response = timeout(Duration::from_secs(self.timeout_secs), send)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout_secs))??;

        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::debug!(status, body = %text, "Control-plane response");

        Ok(status)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn forward(&self, request: ForwardRequest) -> ForwardOutcome {
        let outcome = match self.post(&request).await {
            Ok(200) => ForwardOutcome::Accepted,
            Ok(status) => {
                tracing::warn!(
                    kind = request.kind(),
                    status,
                    "Unexpected control-plane response status"
                );
                ForwardOutcome::Rejected { status }
            }
            Err(e) => {
                tracing::error!(kind = request.kind(), error = %e, "Control-plane request failed");
                ForwardOutcome::Failed
            }
        };

        metrics::record_forward(request.kind(), outcome);
        outcome
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, BackendError> {
    let url = Url::parse(endpoint).map_err(|_| BackendError::InvalidEndpoint(endpoint.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(BackendError::InvalidEndpoint(endpoint.to_string())),
    }
}

/// `configuration` resolved beneath the endpoint path.
fn configuration_url(endpoint: &Url) -> Result<Url, BackendError> {
    let mut base = endpoint.clone();
    base.set_query(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("configuration")
        .map_err(|_| BackendError::InvalidEndpoint(endpoint.to_string()))
}
