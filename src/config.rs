use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info};

use crate::ipfs::GatewayConfig;
use crate::listing::FilterMode;

/// Metadata pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub filter_mode: FilterMode,
    /// Issue a background HEAD request for every resolved image
    pub probe_images: bool,
    /// Unset means requests never time out
    pub request_timeout_secs: Option<u64>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Strict,
            probe_images: true,
            request_timeout_secs: None,
        }
    }
}

impl MetadataConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint of the chain the marketplace lives on
    pub rpc_url: String,
    pub contract_address: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))
    }

    /// Parse TOML, resolve `${VAR}` placeholders and apply environment
    /// overrides.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents).context("Failed to parse config")?;
        config.rpc_url = resolve_env_placeholders(&config.rpc_url)
            .context("Failed resolving env vars referenced in 'rpc_url'")?;
        config.contract_address = resolve_env_placeholders(&config.contract_address)
            .context("Failed resolving env vars referenced in 'contract_address'")?;
        config.gateway.primary = resolve_env_placeholders(&config.gateway.primary)
            .context("Failed resolving env vars referenced in 'gateway.primary'")?;
        config.gateway.apply_env_override();
        Ok(config)
    }
}

/// Load the config and log what was picked up.
pub fn load_and_log(path: &Path) -> Result<Config> {
    let config = match Config::load_from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };
    info!("Loaded configuration from '{}'", path.display());
    info!(
        "Marketplace contract {} via primary gateway {} (fallback {})",
        config.contract_address, config.gateway.primary, config.gateway.alternate
    );
    Ok(config)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("valid placeholder regex"))
}

/// Replaces `${VAR_NAME}` references with the variable's value. Fails
/// naming the first variable that is not set.
pub fn resolve_env_placeholders(input: &str) -> Result<String> {
    let mut resolved = input.to_string();
    for caps in placeholder_regex().captures_iter(input) {
        let var_name = &caps[1];
        let value = std::env::var(var_name)
            .with_context(|| format!("Environment variable '{var_name}' is not set"))?;
        resolved = resolved.replace(&caps[0], &value);
    }
    Ok(resolved)
}
