//! reqwest-backed gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::gateway::{GatewayRequest, Method, RawResponse, RemoteResourceGateway};
use crate::{GatewayError, GatewayResult};

/// Header carrying the per-call correlation id.
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

/// Configuration of the HTTP gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL every request path is appended to, e.g.
    /// `https://api.example.com/my-shop`.
    pub base_url: String,
    /// Per-request timeout (seconds). Operation deadlines are separate.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Pre-acquired access token. Acquiring it is the caller's job.
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            user_agent: format!("storeconf/{}", env!("CARGO_PKG_VERSION")),
            bearer_token: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Gateway that performs each call as one HTTP request.
#[derive(Debug)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpGateway {
    /// Creates a gateway; fails on an empty base URL or a client build error.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(GatewayError::Config("base_url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RemoteResourceGateway for HttpGateway {
    async fn call(&self, request: &GatewayRequest) -> GatewayResult<RawResponse> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.url(&request.path);
        debug!("{} {} [{}]", request.method, url, correlation_id);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        builder = builder.header(CORRELATION_HEADER, &correlation_id);
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}
