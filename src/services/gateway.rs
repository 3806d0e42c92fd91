//! Content Gateway Fetcher
//!
//! Resolves `ipfs://` token URIs through an ordered chain of HTTP gateways.
//! Each gateway contributes its own base URL and an optional access-token
//! suffix (for example `?pinataGatewayToken=...`). The first gateway that
//! answers 2xx with a JSON body wins; failures move straight on to the next
//! gateway without delay.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::services::pointer::IPFS_PREFIX;

/// One gateway of the chain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentGateway {
    /// Prefix the CID is appended to, e.g. `https://ipfs.io/ipfs/`
    pub base_url: String,
    /// Appended after the CID; empty for public gateways
    #[serde(default)]
    pub token_suffix: String,
}

impl ContentGateway {
    pub fn new(base_url: impl Into<String>, token_suffix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_suffix: token_suffix.into(),
        }
    }

    /// `base_url + cid + token_suffix`
    pub fn url_for(&self, cid: &str) -> String {
        format!("{}{}{}", self.base_url, cid, self.token_suffix)
    }
}

/// Failures of a single outbound GET
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid body: {0}")]
    Decode(String),
}

/// Body of a successful direct fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBody {
    pub body: String,
    pub content_type: Option<String>,
}

/// Capability to GET a URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// GET `url` and parse a 2xx body as JSON
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;

    /// GET `url` and return a 2xx body as text
    async fn get_text(&self, url: &str) -> Result<TextBody, FetchError>;
}

/// All gateways failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("All {attempts} gateway(s) failed")]
pub struct Exhausted {
    pub attempts: usize,
}

/// Ordered, immutable list of gateways
#[derive(Debug, Clone, Default)]
pub struct GatewayChain {
    gateways: Vec<ContentGateway>,
}

impl GatewayChain {
    pub fn new(gateways: Vec<ContentGateway>) -> Self {
        Self { gateways }
    }

    /// Append a secondary list after the current gateways
    pub fn extend(&mut self, more: Vec<ContentGateway>) {
        self.gateways.extend(more);
    }

    pub fn gateways(&self) -> &[ContentGateway] {
        &self.gateways
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Fetch the JSON document behind an `ipfs://` pointer
    ///
    /// A pointer without the prefix is used as a bare CID.
    pub async fn fetch(
        &self,
        fetcher: &dyn ContentFetcher,
        pointer: &str,
    ) -> Result<serde_json::Value, Exhausted> {
        let cid = pointer.strip_prefix(IPFS_PREFIX).unwrap_or(pointer);

        for (index, gateway) in self.gateways.iter().enumerate() {
            let url = gateway.url_for(cid);
            match fetcher.get_json(&url).await {
                Ok(value) => {
                    debug!(gateway = %gateway.base_url, cid = %cid, "Gateway fetch succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    // Log the base URL only; the suffix may carry an access token
                    warn!(
                        attempt = index + 1,
                        total = self.gateways.len(),
                        gateway = %gateway.base_url,
                        cid = %cid,
                        error = %e,
                        "Gateway fetch failed, trying next gateway"
                    );
                }
            }
        }

        Err(Exhausted {
            attempts: self.gateways.len(),
        })
    }
}

/// `ContentFetcher` over reqwest
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ul-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { http_client }
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let bytes = self
            .get_ok(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn get_text(&self, url: &str) -> Result<TextBody, FetchError> {
        let response = self.get_ok(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        Ok(TextBody { body, content_type })
    }
}
