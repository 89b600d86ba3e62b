use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::httpclient::build_client;
use crate::httpclient::fetch::{fetch_ok, probe_reachability};
use crate::ipfs::url::IPFS_SCHEME;
use crate::ipfs::GatewayConfig;

use super::{MetadataSource, NftMetadata};

/// Resolves token URIs to metadata documents through an IPFS gateway.
#[derive(Clone, Debug)]
pub struct MetadataFetcher {
    http: reqwest::Client,
    gateways: GatewayConfig,
    probe_images: bool,
}

impl MetadataFetcher {
    pub fn new(gateways: GatewayConfig) -> anyhow::Result<Self> {
        Ok(Self::with_client(build_client(None)?, gateways))
    }

    pub fn with_client(http: reqwest::Client, gateways: GatewayConfig) -> Self {
        Self {
            http,
            gateways,
            probe_images: true,
        }
    }

    /// Enable or disable the background image reachability probe.
    pub fn with_image_probe(mut self, probe_images: bool) -> Self {
        self.probe_images = probe_images;
        self
    }

    pub fn gateways(&self) -> &GatewayConfig {
        &self.gateways
    }

    /// Fetch and normalize the metadata document behind `uri`.
    ///
    /// URIs rejected by the classifier return `None` without touching the
    /// network. Transport failures, non-2xx responses and unparseable bodies
    /// are logged and also collapse to `None`; callers only learn that no
    /// metadata is available.
    pub async fn fetch_metadata(&self, uri: &str) -> Option<NftMetadata> {
        if !self.gateways.is_valid_metadata_uri(uri) {
            debug!("Invalid IPFS hash: {}", uri);
            return None;
        }

        let url = self.gateways.to_gateway_url(uri);
        info!("Fetching metadata from: {}", url);

        let response = match fetch_ok(&self.http, &url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch metadata from {}: {}", url, e);
                return None;
            }
        };

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read metadata body from {}: {}", url, e);
                return None;
            }
        };

        let mut metadata: NftMetadata = match serde_json::from_slice(&body) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Failed to parse metadata JSON from {}: {}", url, e);
                return None;
            }
        };

        if metadata.image.starts_with(IPFS_SCHEME) {
            let converted = self.gateways.to_gateway_url(&metadata.image);
            debug!("Converted image URL from {} to {}", metadata.image, converted);
            metadata.image = converted;
        }

        if self.probe_images && !metadata.image.is_empty() {
            self.spawn_image_probe(metadata.image.clone());
        }

        Some(metadata)
    }

    // Detached: the probe result only feeds the log and is never awaited.
    fn spawn_image_probe(&self, image_url: String) {
        let http = self.http.clone();
        tokio::spawn(probe_reachability(http, image_url));
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    fn accepts(&self, uri: &str) -> bool {
        self.gateways.is_valid_metadata_uri(uri)
    }

    async fn fetch_metadata(&self, uri: &str) -> Option<NftMetadata> {
        MetadataFetcher::fetch_metadata(self, uri).await
    }
}
