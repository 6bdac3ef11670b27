//! # checkout-currency
//!
//! Currency support for the checkout flow: which currencies we sell in,
//! where exchange rates come from, and how a USD catalog price turns into
//! the number a customer actually sees.
//!
//! ## Pricing rules
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  USD catalog price × rate  ──▶  rounding rule  ──▶  Price      │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Charm99     monthly plans      €9.13   → €9.99               │
//! │  WholeUnits  yearly / lifetime  €91.17  → €91                 │
//! │  zero-decimal currencies        ¥1497.6 → ¥1498               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rates come from a [`RateSource`]: either the built-in table
//! ([`StaticRates`]) or a live feed ([`LiveRates`]) cached for 12 hours that
//! falls back to the table whenever the feed is unavailable.

pub mod detect;
pub mod error;
pub mod model;
pub mod pricing;
pub mod rates;

pub use detect::detect_currency;
pub use error::{CurrencyError, Result};
pub use model::{CurrencyInfo, CurrencyTable};
pub use pricing::{Price, RoundingRule, convert, format_price, to_minor_units};
pub use rates::{LiveRates, RateSnapshot, RateSource, StaticRates};
