pub mod config;
pub mod url;

pub use config::GatewayConfig;
pub use url::{
    extract_cid, from_gateway_url, ipfs_uri, is_valid_metadata_uri, to_alternate_gateway_url,
    to_gateway_url, IPFS_SCHEME,
};
