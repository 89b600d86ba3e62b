use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use prettytable::{row, Table};
use tracing::info;

use nftmarket::config;
use nftmarket::contract::MarketplaceView;
use nftmarket::ipfs::{extract_cid, to_gateway_url};
use nftmarket::listing::{FilterMode, Listing, ListingWithMetadata};
use nftmarket::logging::{self, LogLevel};
use nftmarket::units::{
    format_address, format_duration_hours_as_days, format_platform_fee, format_rent_end,
    format_time_remaining, format_wei_with_separators, is_rental_expired, Amount,
};
use nftmarket::Marketplace;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the marketplace configuration file
    #[arg(short, long = "config", default_value = "nftmarket.toml")]
    config_path: PathBuf,

    /// Set the log level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Override what happens to listings whose token URI is not accepted
    #[arg(long, value_enum)]
    filter_mode: Option<FilterMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List NFTs together with their metadata
    Listings {
        #[arg(long, value_enum, default_value = "marketplace")]
        view: ViewArg,

        /// Renter address, required by the rented view
        #[arg(long)]
        user: Option<String>,
    },
    /// Show a single NFT
    Token { token_id: String },
    /// Show marketplace settings and, optionally, an account's balances
    Info {
        #[arg(long)]
        user: Option<String>,
    },
    /// Resolve a token URI and print its metadata document
    Metadata { uri: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ViewArg {
    Marketplace,
    Buy,
    Rent,
    Rented,
}

fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .with_context(|| format!("Invalid address '{s}'"))
}

fn parse_token_id(s: &str) -> Result<U256> {
    s.parse::<U256>()
        .with_context(|| format!("Invalid token id '{s}'"))
}

fn marketplace_view(view: ViewArg, user: Option<&str>) -> Result<MarketplaceView> {
    Ok(match view {
        ViewArg::Marketplace => MarketplaceView::Marketplace,
        ViewArg::Buy => MarketplaceView::Buy,
        ViewArg::Rent => MarketplaceView::Rent,
        ViewArg::Rented => {
            let user = user.context("--user is required for the rented view")?;
            MarketplaceView::Rented {
                user: parse_address(user)?,
            }
        }
    })
}

fn listing_label(listing: &Listing) -> String {
    if !listing.active {
        "Not listed".to_string()
    } else if listing.for_rent {
        format!(
            "For Rent ({} - {})",
            format_duration_hours_as_days(listing.min_rent_duration),
            format_duration_hours_as_days(listing.max_rent_duration)
        )
    } else {
        "For Sale".to_string()
    }
}

fn rental_label(listing: &Listing) -> String {
    if !listing.has_renter() {
        return "-".to_string();
    }
    if is_rental_expired(listing.rent_end) {
        format!("Ended {}", format_rent_end(listing.rent_end))
    } else {
        format!("{} left", format_time_remaining(listing.rent_end))
    }
}

fn print_listings(listings: &[ListingWithMetadata]) {
    if listings.is_empty() {
        println!("No NFTs found");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Token", "Name", "Price", "Listing", "Rental", "Seller", "Image"]);
    for item in listings {
        let listing = &item.listing;
        table.add_row(row![
            listing.token_id,
            item.display_name(),
            listing.price,
            listing_label(listing),
            rental_label(listing),
            format_address(&listing.seller),
            item.image_label()
        ]);
    }
    table.printstd();
}

async fn show_listings(market: &Marketplace, view: MarketplaceView) -> Result<()> {
    let listings = market.reader.listings(view).await?;
    info!("Found {} NFTs", listings.len());

    let listing_view = market.view();
    listing_view.refresh(listings).await;
    print_listings(&listing_view.current().listings);
    Ok(())
}

async fn show_token(market: &Marketplace, token_id: U256) -> Result<()> {
    let listing = market.reader.nft(token_id).await?;
    let (status, rent, royalty) = tokio::try_join!(
        market.reader.nft_status(token_id),
        market.reader.rent_info(token_id),
        market.reader.royalty_info(token_id, listing.price.to_wei())
    )?;
    let metadata = market.fetcher.fetch_metadata(&listing.token_uri).await;
    let item = ListingWithMetadata::resolved(listing, metadata);
    let listing = &item.listing;

    let mut table = Table::new();
    table.add_row(row!["Token", listing.token_id]);
    table.add_row(row!["Name", item.display_name()]);
    table.add_row(row!["Status", status]);
    table.add_row(row!["Seller", listing.seller]);
    table.add_row(row![
        "Price",
        format!("{} (stored as {})", listing.price, listing.price.raw())
    ]);
    table.add_row(row!["Listing", listing_label(listing)]);
    if rent.renter != Address::ZERO {
        table.add_row(row!["Renter", rent.renter]);
        table.add_row(row!["Rental ends", format_rent_end(rent.rent_end)]);
        table.add_row(row!["Time remaining", format_time_remaining(rent.rent_end)]);
    }
    table.add_row(row![
        "Royalty",
        format!(
            "{} to {}",
            Amount::Wei(royalty.amount),
            format_address(&royalty.receiver)
        )
    ]);
    table.add_row(row!["Image", item.image_label()]);
    if let Some(alternate) = market
        .fetcher
        .gateways()
        .alternate_image_url(item.image_label())
    {
        table.add_row(row!["Image (fallback)", alternate]);
    }
    table.add_row(row![
        "Metadata",
        to_gateway_url(&listing.token_uri, &market.fetcher.gateways().primary)
    ]);
    if let Some(cid) = extract_cid(&listing.token_uri) {
        table.add_row(row!["CID", cid]);
    }
    if let Some(metadata) = item.metadata.as_loaded() {
        if !metadata.description.is_empty() {
            table.add_row(row!["Description", metadata.description]);
        }
        for attribute in &metadata.attributes {
            table.add_row(row![attribute.trait_type, attribute.value]);
        }
    }
    table.printstd();
    Ok(())
}

async fn show_info(market: &Marketplace, user: Option<Address>) -> Result<()> {
    let summary = market.reader.summary().await?;

    let mut table = Table::new();
    table.add_row(row!["Contract", market.reader.address()]);
    table.add_row(row!["Owner", summary.owner]);
    table.add_row(row!["Platform fee", format_platform_fee(summary.platform_fee_percent)]);
    table.add_row(row!["Total minted", summary.total_minted]);

    if let Some(user) = user {
        let (pending, owned, rented) = tokio::try_join!(
            market.reader.pending_withdrawals(user),
            market.reader.nfts_owned_by(user),
            market.reader.nfts_rented_by(user)
        )?;
        table.add_row(row![
            "Pending withdrawals",
            format!(
                "{} ({} wei)",
                Amount::Wei(pending),
                format_wei_with_separators(pending)
            )
        ]);
        let owned: Vec<String> = owned.iter().map(U256::to_string).collect();
        table.add_row(row!["Owned tokens", owned.join(", ")]);
        table.add_row(row!["Renting", rented.len()]);
    }
    table.printstd();
    Ok(())
}

async fn show_metadata(market: &Marketplace, uri: &str) -> Result<()> {
    match market.fetcher.fetch_metadata(uri).await {
        Some(metadata) => println!("{}", serde_json::to_string_pretty(&metadata)?),
        None => println!("No metadata available for {uri}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    logging::init(args.log_level);

    let mut config = config::load_and_log(&args.config_path)?;
    if let Some(mode) = args.filter_mode {
        config.metadata.filter_mode = mode;
    }
    let market = Marketplace::from_config(&config)?;

    match args.command {
        Command::Listings { view, user } => {
            let view = marketplace_view(view, user.as_deref())?;
            show_listings(&market, view).await
        }
        Command::Token { token_id } => show_token(&market, parse_token_id(&token_id)?).await,
        Command::Info { user } => {
            let user = user.as_deref().map(parse_address).transpose()?;
            show_info(&market, user).await
        }
        Command::Metadata { uri } => show_metadata(&market, &uri).await,
    }
}
