use serde::Deserialize;

/// Gateway used to turn `ipfs://` URIs into fetchable URLs.
pub const DEFAULT_PRIMARY_GATEWAY: &str = "gateway.pinata.cloud";

/// Gateway tried for images once the primary gateway failed to serve them.
pub const DEFAULT_ALTERNATE_GATEWAY: &str = "ipfs.io";

/// CIDv1 / raw codec / sha2-256, base32 encoded. Only token URIs using this
/// form are treated as marketplace metadata.
pub const DEFAULT_ACCEPTED_CID_PREFIX: &str = "bafkrei";

/// Environment variable overriding the primary gateway host.
pub const PRIMARY_GATEWAY_ENV: &str = "PINATA_GATEWAY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host (or full base URL) of the primary gateway
    pub primary: String,
    /// Host (or full base URL) of the fallback gateway
    pub alternate: String,
    /// CID prefixes accepted by the metadata URI classifier
    pub accepted_cid_prefixes: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_GATEWAY.to_string(),
            alternate: DEFAULT_ALTERNATE_GATEWAY.to_string(),
            accepted_cid_prefixes: vec![DEFAULT_ACCEPTED_CID_PREFIX.to_string()],
        }
    }
}

impl GatewayConfig {
    pub fn with_primary<T: Into<String>>(mut self, primary: T) -> Self {
        self.primary = primary.into();
        self
    }

    pub fn with_alternate<T: Into<String>>(mut self, alternate: T) -> Self {
        self.alternate = alternate.into();
        self
    }

    /// Replace the primary gateway with the value of `PINATA_GATEWAY`, when set.
    pub fn apply_env_override(&mut self) {
        if let Ok(host) = std::env::var(PRIMARY_GATEWAY_ENV) {
            if !host.trim().is_empty() {
                self.primary = host.trim().to_string();
            }
        }
    }

    pub fn is_valid_metadata_uri(&self, uri: &str) -> bool {
        super::url::has_accepted_prefix(uri, &self.accepted_cid_prefixes)
    }

    pub fn to_gateway_url(&self, uri: &str) -> String {
        super::url::to_gateway_url(uri, &self.primary)
    }

    pub fn to_alternate_gateway_url(&self, uri: &str) -> String {
        super::url::to_gateway_url(uri, &self.alternate)
    }

    /// Fallback URL for an image that failed to load from the primary gateway.
    pub fn alternate_image_url(&self, image_url: &str) -> Option<String> {
        super::url::alternate_image_url(image_url, &self.primary, &self.alternate)
    }
}
