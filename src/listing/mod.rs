use alloy::primitives::{Address, U256};
use serde::Deserialize;

use crate::metadata::NftMetadata;
use crate::units::Amount;

mod aggregator;
mod view;

pub use aggregator::ListingAggregator;
pub use view::{ListingView, ViewState};

/// On-chain record describing an NFT's sale or rental state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub token_id: U256,
    pub seller: Address,
    pub price: Amount,
    pub for_rent: bool,
    /// Hours
    pub min_rent_duration: u64,
    /// Hours
    pub max_rent_duration: u64,
    /// Unix seconds, 0 if never rented
    pub rent_end: u64,
    /// Zero address when nobody is renting
    pub renter: Address,
    pub active: bool,
    pub token_uri: String,
}

impl Listing {
    pub fn has_renter(&self) -> bool {
        self.renter != Address::ZERO
    }
}

/// Tri-state metadata slot of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MetadataState {
    /// Not fetched yet
    #[default]
    NotLoaded,
    /// Fetched (or skipped) and nothing usable came back
    Unavailable,
    Loaded(NftMetadata),
}

impl MetadataState {
    pub fn as_loaded(&self) -> Option<&NftMetadata> {
        match self {
            MetadataState::Loaded(metadata) => Some(metadata),
            _ => None,
        }
    }
}

impl From<Option<NftMetadata>> for MetadataState {
    fn from(metadata: Option<NftMetadata>) -> Self {
        match metadata {
            Some(metadata) => MetadataState::Loaded(metadata),
            None => MetadataState::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingWithMetadata {
    pub listing: Listing,
    pub metadata: MetadataState,
    pub is_loading_metadata: bool,
}

impl ListingWithMetadata {
    pub fn loading(listing: Listing) -> Self {
        Self {
            listing,
            metadata: MetadataState::NotLoaded,
            is_loading_metadata: true,
        }
    }

    pub fn resolved(listing: Listing, metadata: Option<NftMetadata>) -> Self {
        Self {
            listing,
            metadata: metadata.into(),
            is_loading_metadata: false,
        }
    }

    /// Metadata name, or `NFT #<id>` when there is none to show.
    pub fn display_name(&self) -> String {
        match self.metadata.as_loaded() {
            Some(metadata) if !metadata.name.is_empty() => metadata.name.clone(),
            _ => format!("NFT #{}", self.listing.token_id),
        }
    }

    /// Text shown in place of the image.
    pub fn image_label(&self) -> &str {
        if self.is_loading_metadata {
            return "Loading...";
        }
        match self.metadata.as_loaded() {
            Some(metadata) if !metadata.image.is_empty() => &metadata.image,
            Some(_) => "No Image",
            None => "Image Error",
        }
    }
}

/// What to do with listings whose token URI the classifier rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Drop them from every view
    #[default]
    Strict,
    /// Keep them, with metadata marked unavailable
    Permissive,
}
