//! Read-side client for an NFT marketplace contract: fetches listings,
//! resolves their IPFS metadata and formats prices and rental state.

use anyhow::Result;

use crate::config::Config;
use crate::contract::{MarketplaceReader, MarketplaceView};
use crate::listing::{FilterMode, ListingAggregator, ListingView, ListingWithMetadata};
use crate::metadata::MetadataFetcher;

pub mod config;
pub mod contract;
pub mod httpclient;
pub mod ipfs;
pub mod listing;
pub mod logging;
pub mod metadata;
pub mod rental;
pub mod units;

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Contract reader and metadata pipeline built from one config.
#[derive(Clone)]
pub struct Marketplace {
    pub reader: MarketplaceReader,
    pub fetcher: MetadataFetcher,
    pub filter_mode: FilterMode,
}

impl Marketplace {
    pub fn from_config(config: &Config) -> Result<Self> {
        let reader = MarketplaceReader::new(&config.rpc_url, &config.contract_address)?;
        let http = httpclient::build_client(config.metadata.request_timeout())?;
        let fetcher = MetadataFetcher::with_client(http, config.gateway.clone())
            .with_image_probe(config.metadata.probe_images);
        Ok(Self {
            reader,
            fetcher,
            filter_mode: config.metadata.filter_mode,
        })
    }

    pub fn aggregator(&self) -> ListingAggregator<MetadataFetcher> {
        ListingAggregator::new(self.fetcher.clone()).with_filter_mode(self.filter_mode)
    }

    /// A fresh view with its own state and generation counter.
    pub fn view(&self) -> ListingView<MetadataFetcher> {
        ListingView::new(self.aggregator())
    }

    /// Query the listings behind `view` and attach their metadata.
    pub async fn load(&self, view: MarketplaceView) -> Result<Vec<ListingWithMetadata>> {
        let listings = self.reader.listings(view).await?;
        Ok(self.aggregator().attach_metadata(listings).await)
    }
}
