use alloy::primitives::U256;
use anyhow::{bail, Result};

use crate::units::{hours_to_days, Amount};

const HOURS_PER_DAY: u64 = 24;

/// Checks a requested rental length against a listing's bounds (stored in
/// hours) and returns the duration in hours to send to the contract.
pub fn validate_rent_days(days: u64, min_hours: u64, max_hours: u64) -> Result<u64> {
    if days == 0 {
        bail!("Please enter a valid rental duration");
    }
    let hours = days
        .checked_mul(HOURS_PER_DAY)
        .filter(|hours| (min_hours..=max_hours).contains(hours));
    match hours {
        Some(hours) => Ok(hours),
        None => bail!(
            "Rental duration must be between {} and {} days",
            hours_to_days(min_hours),
            hours_to_days(max_hours)
        ),
    }
}

/// Value to attach to a rental transaction.
///
/// Daily prices stored in ether follow the contract's integer math:
/// `price * hours / 24` whole ether, then scaled to wei. Prices already in
/// wei are prorated directly.
pub fn rental_cost_wei(price_per_day: Amount, duration_hours: u64) -> U256 {
    let hours = U256::from(duration_hours);
    let per_day = U256::from(HOURS_PER_DAY);
    match price_per_day {
        Amount::Ether(price) => {
            let total_ether = price.saturating_mul(hours) / per_day;
            Amount::Ether(total_ether).to_wei()
        }
        Amount::Wei(price) => price.saturating_mul(hours) / per_day,
    }
}
