//! Price Conversion
//!
//! Turns a USD catalog amount into a customer-facing price in another
//! currency, applying the business rounding rules.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{CurrencyError, Result};
use crate::model::CurrencyInfo;

/// How a converted amount is rounded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Force a ".99" ending (monthly billing)
    Charm99,
    /// Round to whole units (yearly and one-time billing)
    WholeUnits,
}

/// A price in a specific currency
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// ISO code
    pub currency: &'static str,

    /// Amount in major units (e.g. 9.99)
    pub amount: Decimal,

    /// Amount in the currency's smallest unit, as payment providers expect
    pub minor_units: i64,
}

/// Convert a USD amount (in cents) into `currency` at `rate` units per USD.
pub fn convert(usd_cents: i64, currency: &CurrencyInfo, rate: Decimal, rule: RoundingRule) -> Price {
    let usd = Decimal::from(usd_cents) / dec!(100);

    let amount = if currency.is_usd() && rate == Decimal::ONE {
        usd
    } else {
        let raw = usd * rate;
        if !currency.decimals {
            whole_units(raw)
        } else {
            match rule {
                RoundingRule::Charm99 => charm(raw),
                RoundingRule::WholeUnits => whole_units(raw),
            }
        }
    };

    Price {
        currency: currency.code,
        amount,
        minor_units: minor_units_of(amount, currency),
    }
}

fn whole_units(raw: Decimal) -> Decimal {
    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ONE)
}

fn charm(raw: Decimal) -> Decimal {
    raw.floor() + dec!(0.99)
}

fn minor_units_of(amount: Decimal, currency: &CurrencyInfo) -> i64 {
    (amount * currency.minor_factor()).trunc().to_i64().unwrap_or(i64::MAX)
}

/// Sanitize an amount supplied by a client (major units) and convert it to
/// minor units. Rejects non-finite and non-positive values.
pub fn to_minor_units(amount: f64, currency: &CurrencyInfo) -> Result<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CurrencyError::InvalidAmount(amount.to_string()));
    }

    let decimal = Decimal::from_f64(amount)
        .ok_or_else(|| CurrencyError::InvalidAmount(amount.to_string()))?;
    let dp = if currency.decimals { 2 } else { 0 };
    let rounded = decimal.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);

    if rounded <= Decimal::ZERO {
        return Err(CurrencyError::InvalidAmount(amount.to_string()));
    }

    (rounded * currency.minor_factor())
        .to_i64()
        .ok_or_else(|| CurrencyError::InvalidAmount(amount.to_string()))
}

/// Render a price for display, e.g. `€1,234.99` or `¥1,498`.
pub fn format_price(price: &Price, currency: &CurrencyInfo) -> String {
    let dp = if currency.decimals { 2 } else { 0 };
    let rounded = price
        .amount
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded);

    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{}{grouped}.{frac}", currency.symbol),
        None => format!("{sign}{}{grouped}", currency.symbol),
    }
}
