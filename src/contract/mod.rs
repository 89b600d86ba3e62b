use alloy::{
    contract::Error,
    primitives::{Address, U256},
    providers::RootProvider,
    sol,
    transports::http::{reqwest::Url, Client, Http},
};
use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::listing::Listing;
use crate::units::Amount;

pub type HttpProvider = RootProvider<Http<Client>>;

// Read-only subset of the marketplace ABI
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMarketplace {
        struct NFTListing {
            uint256 tokenId;
            address seller;
            uint256 priceInEther;
            bool forRent;
            uint256 minRentDuration;
            uint256 maxRentDuration;
            uint256 rentEnd;
            address renter;
            bool active;
            string tokenURI;
        }

        function getAllNFTs() external view returns (NFTListing[] memory);
        function getNFTsListedForSale() external view returns (NFTListing[] memory);
        function getNFTsListedForRent() external view returns (NFTListing[] memory);
        function getNFTsRentedByUser(address user) external view returns (NFTListing[] memory);
        function getNFTsOwned(address user) external view returns (uint256[] memory);
        function getNFT(uint256 tokenId) external view returns (NFTListing memory);
        function getNFTRentInfo(uint256 tokenId) external view returns (address renter, uint256 rentEnd);
        function royaltyInfo(uint256 tokenId, uint256 salePrice) external view returns (address, uint256);
        function getTotalMinted() external view returns (uint256);
        function marketplaceOwner() external view returns (address);
        function platformFeePercent() external view returns (uint256);
        function pendingWithdrawals(address account) external view returns (uint256);
        function nftStatus(uint256 tokenId) external view returns (uint8);
    }
}

impl From<IMarketplace::NFTListing> for Listing {
    fn from(raw: IMarketplace::NFTListing) -> Self {
        Listing {
            token_id: raw.tokenId,
            seller: raw.seller,
            price: Amount::infer(raw.priceInEther),
            for_rent: raw.forRent,
            min_rent_duration: raw.minRentDuration.saturating_to(),
            max_rent_duration: raw.maxRentDuration.saturating_to(),
            rent_end: raw.rentEnd.saturating_to(),
            renter: raw.renter,
            active: raw.active,
            token_uri: raw.tokenURI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NftStatus {
    Owned,
    ForSale,
    ForRent,
    Rented,
    Unknown(u8),
}

impl From<u8> for NftStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => NftStatus::Owned,
            1 => NftStatus::ForSale,
            2 => NftStatus::ForRent,
            3 => NftStatus::Rented,
            other => NftStatus::Unknown(other),
        }
    }
}

impl fmt::Display for NftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NftStatus::Owned => "Owned",
            NftStatus::ForSale => "For Sale",
            NftStatus::ForRent => "For Rent",
            NftStatus::Rented => "Rented",
            NftStatus::Unknown(_) => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentInfo {
    pub renter: Address,
    pub rent_end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoyaltyInfo {
    pub receiver: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceSummary {
    pub owner: Address,
    pub platform_fee_percent: U256,
    pub total_minted: U256,
}

/// Which listings a page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketplaceView {
    /// Every minted NFT
    Marketplace,
    /// Listed for sale
    Buy,
    /// Listed for rent
    Rent,
    /// Currently rented by `user`
    Rented { user: Address },
}

fn is_rate_limited(e: &Error) -> bool {
    e.to_string().contains("429") || e.to_string().contains("rate limit")
}

async fn try_call_contract<Fut, T>(mut f: impl FnMut() -> Fut) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, Error>> + Send,
{
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY_MS: u64 = 1000;

    let mut attempts = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if is_rate_limited(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                warn!(
                    "Rate limited by RPC, retrying (attempt {}/{})",
                    attempts, MAX_RETRIES
                );
                sleep(Duration::from_millis(RETRY_DELAY_MS * attempts as u64)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read-only access to the marketplace contract. Account-scoped queries
/// take the account explicitly; there is no implicit connected wallet.
#[derive(Clone)]
pub struct MarketplaceReader {
    provider: HttpProvider,
    address: Address,
}

impl MarketplaceReader {
    pub fn new(rpc_url: &str, contract_address: &str) -> Result<Self> {
        let url = rpc_url
            .parse::<Url>()
            .with_context(|| format!("Invalid RPC URL '{rpc_url}'"))?;
        let address = contract_address
            .parse::<Address>()
            .with_context(|| format!("Invalid contract address '{contract_address}'"))?;
        Ok(Self {
            provider: RootProvider::new_http(url),
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn listings(&self, view: MarketplaceView) -> Result<Vec<Listing>> {
        debug!("Querying {:?} listings from {}", view, self.address);
        match view {
            MarketplaceView::Marketplace => self.all_nfts().await,
            MarketplaceView::Buy => self.nfts_listed_for_sale().await,
            MarketplaceView::Rent => self.nfts_listed_for_rent().await,
            MarketplaceView::Rented { user } => self.nfts_rented_by(user).await,
        }
    }

    pub async fn all_nfts(&self) -> Result<Vec<Listing>> {
        let market = IMarketplace::new(self.address, &self.provider);
        let listings = try_call_contract(|| {
            let market = market.clone();
            async move { market.getAllNFTs().call().await }
        })
        .await
        .context("getAllNFTs failed")?;
        Ok(listings._0.into_iter().map(Listing::from).collect())
    }

    pub async fn nfts_listed_for_sale(&self) -> Result<Vec<Listing>> {
        let market = IMarketplace::new(self.address, &self.provider);
        let listings = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFTsListedForSale().call().await }
        })
        .await
        .context("getNFTsListedForSale failed")?;
        Ok(listings._0.into_iter().map(Listing::from).collect())
    }

    pub async fn nfts_listed_for_rent(&self) -> Result<Vec<Listing>> {
        let market = IMarketplace::new(self.address, &self.provider);
        let listings = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFTsListedForRent().call().await }
        })
        .await
        .context("getNFTsListedForRent failed")?;
        Ok(listings._0.into_iter().map(Listing::from).collect())
    }

    pub async fn nfts_rented_by(&self, user: Address) -> Result<Vec<Listing>> {
        let market = IMarketplace::new(self.address, &self.provider);
        let listings = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFTsRentedByUser(user).call().await }
        })
        .await
        .with_context(|| format!("getNFTsRentedByUser({user}) failed"))?;
        Ok(listings._0.into_iter().map(Listing::from).collect())
    }

    pub async fn nfts_owned_by(&self, user: Address) -> Result<Vec<U256>> {
        let market = IMarketplace::new(self.address, &self.provider);
        let owned = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFTsOwned(user).call().await }
        })
        .await
        .with_context(|| format!("getNFTsOwned({user}) failed"))?;
        Ok(owned._0)
    }

    pub async fn nft(&self, token_id: U256) -> Result<Listing> {
        let market = IMarketplace::new(self.address, &self.provider);
        let listing = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFT(token_id).call().await }
        })
        .await
        .with_context(|| format!("getNFT({token_id}) failed"))?;
        Ok(listing._0.into())
    }

    pub async fn rent_info(&self, token_id: U256) -> Result<RentInfo> {
        let market = IMarketplace::new(self.address, &self.provider);
        let info = try_call_contract(|| {
            let market = market.clone();
            async move { market.getNFTRentInfo(token_id).call().await }
        })
        .await
        .with_context(|| format!("getNFTRentInfo({token_id}) failed"))?;
        Ok(RentInfo {
            renter: info.renter,
            rent_end: info.rentEnd.saturating_to(),
        })
    }

    pub async fn royalty_info(&self, token_id: U256, sale_price: U256) -> Result<RoyaltyInfo> {
        let market = IMarketplace::new(self.address, &self.provider);
        let info = try_call_contract(|| {
            let market = market.clone();
            async move { market.royaltyInfo(token_id, sale_price).call().await }
        })
        .await
        .with_context(|| format!("royaltyInfo({token_id}) failed"))?;
        Ok(RoyaltyInfo {
            receiver: info._0,
            amount: info._1,
        })
    }

    pub async fn total_minted(&self) -> Result<U256> {
        let market = IMarketplace::new(self.address, &self.provider);
        let total = try_call_contract(|| {
            let market = market.clone();
            async move { market.getTotalMinted().call().await }
        })
        .await
        .context("getTotalMinted failed")?;
        Ok(total._0)
    }

    pub async fn marketplace_owner(&self) -> Result<Address> {
        let market = IMarketplace::new(self.address, &self.provider);
        let owner = try_call_contract(|| {
            let market = market.clone();
            async move { market.marketplaceOwner().call().await }
        })
        .await
        .context("marketplaceOwner failed")?;
        Ok(owner._0)
    }

    pub async fn platform_fee_percent(&self) -> Result<U256> {
        let market = IMarketplace::new(self.address, &self.provider);
        let fee = try_call_contract(|| {
            let market = market.clone();
            async move { market.platformFeePercent().call().await }
        })
        .await
        .context("platformFeePercent failed")?;
        Ok(fee._0)
    }

    pub async fn pending_withdrawals(&self, account: Address) -> Result<U256> {
        let market = IMarketplace::new(self.address, &self.provider);
        let pending = try_call_contract(|| {
            let market = market.clone();
            async move { market.pendingWithdrawals(account).call().await }
        })
        .await
        .with_context(|| format!("pendingWithdrawals({account}) failed"))?;
        Ok(pending._0)
    }

    pub async fn nft_status(&self, token_id: U256) -> Result<NftStatus> {
        let market = IMarketplace::new(self.address, &self.provider);
        let status = try_call_contract(|| {
            let market = market.clone();
            async move { market.nftStatus(token_id).call().await }
        })
        .await
        .with_context(|| format!("nftStatus({token_id}) failed"))?;
        Ok(NftStatus::from(status._0))
    }

    pub async fn summary(&self) -> Result<MarketplaceSummary> {
        let (owner, platform_fee_percent, total_minted) = tokio::try_join!(
            self.marketplace_owner(),
            self.platform_fee_percent(),
            self.total_minted()
        )?;
        Ok(MarketplaceSummary {
            owner,
            platform_fee_percent,
            total_minted,
        })
    }
}
