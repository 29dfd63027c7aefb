//! Remote block gateway.
//!
//! Missing blocks are fetched with a plain HTTP GET of
//! `{gateway}/ipfs/{cid}?format=raw`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use skiff_crypto::{Cid, verify_content_id};
use tracing::debug;

use crate::error::{DepotError, DepotResult};

/// Default public gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://w3s.link";

/// Source of blocks the local store does not have.
#[async_trait]
pub trait BlockGateway: Send + Sync {
    /// Fetch the bytes of `cid`.
    ///
    /// # Errors
    ///
    /// [`DepotError::NotFound`] if the remote does not have the block,
    /// [`DepotError::Fetch`] on transport failures.
    async fn fetch(&self, cid: &Cid) -> DepotResult<Vec<u8>>;
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL, without the `/ipfs` suffix.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Largest block accepted, in bytes.
    pub max_block_size: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_block_size: 4_194_304,
        }
    }
}

/// [`BlockGateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Build a gateway client.
    ///
    /// # Errors
    ///
    /// Returns [`DepotError::Client`] if the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> DepotResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("skiff-depot/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| DepotError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// The settings in use.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The URL a block is fetched from.
    #[must_use]
    pub fn block_url(&self, cid: &Cid) -> String {
        format!(
            "{}/ipfs/{cid}?format=raw",
            self.config.url.trim_end_matches('/')
        )
    }

    async fn read_body(&self, cid: &Cid, response: reqwest::Response) -> DepotResult<Vec<u8>> {
        let limit = self.config.max_block_size;
        let too_large = |size: u64| DepotError::Fetch {
            cid: cid.to_string(),
            reason: format!("block of {size} bytes exceeds limit of {limit}"),
        };

        if let Some(len) = response.content_length()
            && len > limit
        {
            return Err(too_large(len));
        }

        let capacity =
            usize::try_from(response.content_length().unwrap_or(0).min(limit)).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DepotError::Fetch {
                cid: cid.to_string(),
                reason: e.to_string(),
            })?;
            bytes.extend_from_slice(&chunk);
            let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            if size > limit {
                return Err(too_large(size));
            }
        }
        Ok(bytes)
    }
}

#[async_trait]
impl BlockGateway for HttpGateway {
    async fn fetch(&self, cid: &Cid) -> DepotResult<Vec<u8>> {
        let url = self.block_url(cid);
        debug!(%cid, %url, "fetching block from gateway");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.ipld.raw")
            .send()
            .await
            .map_err(|e| DepotError::Fetch {
                cid: cid.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            debug!(%cid, status = %response.status(), "gateway does not have block");
            return Err(DepotError::NotFound {
                cid: cid.to_string(),
            });
        }

        let bytes = self.read_body(cid, response).await?;
        match verify_content_id(cid, &bytes) {
            Some(true) => {},
            Some(false) => {
                return Err(DepotError::Fetch {
                    cid: cid.to_string(),
                    reason: "content does not match cid".into(),
                });
            },
            None => {
                debug!(%cid, hash = cid.hash().code(), "hash function not verified");
            },
        }
        Ok(bytes)
    }
}
