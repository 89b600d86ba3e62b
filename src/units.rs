use std::fmt;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Raw prices above this are assumed to be denominated in wei.
pub const WEI_SCALE_THRESHOLD: u64 = 1_000_000;

/// 10^14 wei, the smallest step shown with four decimals.
const WEI_PER_DISPLAY_UNIT: u64 = 100_000_000_000_000;
const DISPLAY_UNITS_PER_ETHER: u64 = 10_000;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 86_400;
const HOURS_PER_DAY: u64 = 24;

/// A price with an explicit unit. Contract listings store prices either in
/// wei or in whole ether depending on how they were listed; [`Amount::infer`]
/// decides which from the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    Wei(U256),
    Ether(U256),
}

impl Amount {
    pub fn infer(raw: U256) -> Self {
        if raw > U256::from(WEI_SCALE_THRESHOLD) {
            Amount::Wei(raw)
        } else {
            Amount::Ether(raw)
        }
    }

    /// The number as stored, without its unit.
    pub fn raw(&self) -> U256 {
        match self {
            Amount::Wei(v) | Amount::Ether(v) => *v,
        }
    }

    pub fn to_wei(&self) -> U256 {
        match self {
            Amount::Wei(v) => *v,
            Amount::Ether(v) => v.saturating_mul(U256::from(WEI_PER_ETHER)),
        }
    }

    /// Ether value with exactly four decimals, rounded half up.
    pub fn format_ether(&self) -> String {
        match self {
            Amount::Ether(v) => format!("{v}.0000"),
            Amount::Wei(v) => format_wei_as_ether(*v),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.format_ether())
    }
}

fn format_wei_as_ether(wei: U256) -> String {
    let step = U256::from(WEI_PER_DISPLAY_UNIT);
    let mut units = wei / step;
    // remainder < 10^14, doubling cannot overflow
    if (wei % step) * U256::from(2u64) >= step {
        units += U256::from(1u64);
    }
    let per_ether = U256::from(DISPLAY_UNITS_PER_ETHER);
    let whole = units / per_ether;
    let fraction: u64 = (units % per_ether).saturating_to();
    format!("{whole}.{fraction:04}")
}

/// Exact decimal rendering with comma thousands separators.
pub fn format_wei_with_separators(wei: U256) -> String {
    group_thousands(&wei.to_string())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Platform fee stored in tenths of a percent, rendered with one decimal.
pub fn format_platform_fee(tenths_of_percent: U256) -> String {
    let ten = U256::from(10u64);
    let whole = tenths_of_percent / ten;
    let tenth = tenths_of_percent % ten;
    format!("{whole}.{tenth}%")
}

/// Formats a price whose unit is unknown: values above one million are
/// read as wei, anything else as ether.
pub fn format_ether_heuristic(raw: U256) -> String {
    Amount::infer(raw).format_ether()
}

pub fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

pub fn is_rental_expired(rent_end: u64) -> bool {
    is_rental_expired_at(rent_end, now_unix())
}

pub fn is_rental_expired_at(rent_end: u64, now: u64) -> bool {
    now >= rent_end
}

pub fn format_time_remaining(rent_end: u64) -> String {
    format_time_remaining_at(rent_end, now_unix())
}

/// `Expired`, or the time left in its coarsest unit pair: `2d 5h`,
/// `3h 12m`, `45m`.
pub fn format_time_remaining_at(rent_end: u64, now: u64) -> String {
    if is_rental_expired_at(rent_end, now) {
        return "Expired".to_string();
    }

    let remaining = rent_end - now;
    let days = remaining / SECONDS_PER_DAY;
    let hours = (remaining % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (remaining % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Rental durations are stored in hours and shown in days.
pub fn format_duration_hours_as_days(hours: u64) -> String {
    if hours == HOURS_PER_DAY {
        return "1 day".to_string();
    }
    format!("{} days", hours_to_days(hours))
}

/// Whole days print without decimals; partial days keep up to two.
pub(crate) fn hours_to_days(hours: u64) -> String {
    if hours % HOURS_PER_DAY == 0 {
        return (hours / HOURS_PER_DAY).to_string();
    }
    let days = format!("{:.2}", hours as f64 / HOURS_PER_DAY as f64);
    days.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `0x1234...abcd`
pub fn format_address(address: &Address) -> String {
    let s = address.to_string();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}

/// Calendar rendering of a rental end timestamp.
pub fn format_rent_end(rent_end: u64) -> String {
    if rent_end == 0 {
        return "Never".to_string();
    }
    match i64::try_from(rent_end)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "Invalid date".to_string(),
    }
}
