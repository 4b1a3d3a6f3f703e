//! Utility functions for the portfolio hedge library.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Calendar days per year used for time-to-expiration.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Formats an expiration date as a string in `YYYYMMDD` format.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use portfolio_hedge::utils::format_expiration_yyyymmdd;
///
/// let date = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
/// assert_eq!(format_expiration_yyyymmdd(date), "20251219");
/// ```
#[must_use]
pub fn format_expiration_yyyymmdd(expiration: NaiveDate) -> String {
    expiration.format("%Y%m%d").to_string()
}

/// Returns the nearest date at or after `as_of + days_out` that falls on `weekday`.
///
/// Returns `None` only if the date arithmetic overflows the calendar.
///
/// # Examples
///
/// ```rust
/// use chrono::{NaiveDate, Weekday};
/// use portfolio_hedge::utils::next_expiration;
///
/// // 2025-01-06 is a Monday; 30 days later is Wednesday 2025-02-05.
/// let as_of = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
/// let expiry = next_expiration(as_of, 30, Weekday::Fri).unwrap();
/// assert_eq!(expiry, NaiveDate::from_ymd_opt(2025, 2, 7).unwrap());
/// ```
#[must_use]
pub fn next_expiration(as_of: NaiveDate, days_out: u32, weekday: Weekday) -> Option<NaiveDate> {
    let earliest = as_of.checked_add_days(Days::new(u64::from(days_out)))?;
    let current = earliest.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let offset = (target + 7 - current) % 7;
    earliest.checked_add_days(Days::new(u64::from(offset)))
}

/// Year fraction between two dates on an ACT/365 basis, floored at zero.
#[must_use]
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> f64 {
    let days = (to - from).num_days();
    (days.max(0) as f64) / DAYS_PER_YEAR
}

/// Rounds a price to the nearest listed increment, if one is configured.
#[must_use]
pub fn round_to_increment(value: f64, increment: Option<f64>) -> f64 {
    match increment {
        Some(step) if step > 0.0 && step.is_finite() => (value / step).round() * step,
        _ => value,
    }
}

/// Converts a floating point dollar amount into a `Decimal`.
///
/// Non-finite input maps to zero.
#[must_use]
pub fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Converts a `Decimal` dollar amount back to `f64`.
#[must_use]
pub fn money_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Total premium outlay for `contracts` at `premium_per_share`.
///
/// Every dollar total in the crate goes through this function so that the same
/// position always reports the same amount.
#[must_use]
pub fn premium_outlay(contracts: u64, premium_per_share: f64, multiplier: u32) -> Decimal {
    (Decimal::from(contracts) * to_money(premium_per_share) * Decimal::from(multiplier))
        .round_dp(2)
}
