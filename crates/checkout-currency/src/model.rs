//! Currency Models
//!
//! The set of currencies checkout can charge in, with a built-in USD rate for
//! each one. Uses `rust_decimal` for rates - never use f64 for money!

use std::sync::LazyLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// A supported currency
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    /// ISO 4217 code, uppercase (e.g. "EUR")
    pub code: &'static str,

    /// Display name
    pub name: &'static str,

    /// Symbol placed before the amount
    pub symbol: &'static str,

    /// Units of this currency per 1 USD (fallback when no live rate)
    pub usd_rate: Decimal,

    /// Whether the currency has minor units. `false` for zero-decimal
    /// currencies such as JPY, where amounts are whole numbers.
    pub decimals: bool,
}

impl CurrencyInfo {
    const fn new(
        code: &'static str,
        name: &'static str,
        symbol: &'static str,
        usd_rate: Decimal,
        decimals: bool,
    ) -> Self {
        Self {
            code,
            name,
            symbol,
            usd_rate,
            decimals,
        }
    }

    /// Multiplier between major and minor units (100, or 1 for zero-decimal)
    pub fn minor_factor(&self) -> Decimal {
        if self.decimals { dec!(100) } else { Decimal::ONE }
    }

    /// Lowercase code as payment providers expect it
    pub fn provider_code(&self) -> String {
        self.code.to_lowercase()
    }

    pub fn is_usd(&self) -> bool {
        self.code == "USD"
    }
}

static CURRENCIES: LazyLock<Vec<CurrencyInfo>> = LazyLock::new(|| {
    vec![
        CurrencyInfo::new("USD", "US Dollar", "$", dec!(1), true),
        CurrencyInfo::new("EUR", "Euro", "€", dec!(0.92), true),
        CurrencyInfo::new("GBP", "British Pound", "£", dec!(0.79), true),
        CurrencyInfo::new("CAD", "Canadian Dollar", "CA$", dec!(1.36), true),
        CurrencyInfo::new("AUD", "Australian Dollar", "A$", dec!(1.52), true),
        CurrencyInfo::new("NZD", "New Zealand Dollar", "NZ$", dec!(1.66), true),
        CurrencyInfo::new("CHF", "Swiss Franc", "CHF ", dec!(0.88), true),
        CurrencyInfo::new("SEK", "Swedish Krona", "SEK ", dec!(10.5), true),
        CurrencyInfo::new("NOK", "Norwegian Krone", "NOK ", dec!(10.6), true),
        CurrencyInfo::new("DKK", "Danish Krone", "DKK ", dec!(6.9), true),
        CurrencyInfo::new("PLN", "Polish Zloty", "zł ", dec!(4.0), true),
        CurrencyInfo::new("TRY", "Turkish Lira", "₺", dec!(32.0), true),
        CurrencyInfo::new("INR", "Indian Rupee", "₹", dec!(83.5), true),
        CurrencyInfo::new("BRL", "Brazilian Real", "R$", dec!(5.0), true),
        CurrencyInfo::new("MXN", "Mexican Peso", "MX$", dec!(17.1), true),
        CurrencyInfo::new("SGD", "Singapore Dollar", "S$", dec!(1.34), true),
        CurrencyInfo::new("HKD", "Hong Kong Dollar", "HK$", dec!(7.82), true),
        CurrencyInfo::new("CNY", "Chinese Yuan", "CN¥", dec!(7.2), true),
        CurrencyInfo::new("ZAR", "South African Rand", "R ", dec!(18.6), true),
        CurrencyInfo::new("AED", "UAE Dirham", "AED ", dec!(3.67), true),
        CurrencyInfo::new("PHP", "Philippine Peso", "₱", dec!(56.0), true),
        CurrencyInfo::new("THB", "Thai Baht", "฿", dec!(35.8), true),
        CurrencyInfo::new("IDR", "Indonesian Rupiah", "Rp ", dec!(15700), true),
        CurrencyInfo::new("JPY", "Japanese Yen", "¥", dec!(150), false),
        CurrencyInfo::new("KRW", "South Korean Won", "₩", dec!(1350), false),
        CurrencyInfo::new("VND", "Vietnamese Dong", "₫", dec!(24500), false),
        CurrencyInfo::new("CLP", "Chilean Peso", "CLP ", dec!(940), false),
    ]
});

/// Lookup table over the supported currencies
pub struct CurrencyTable;

impl CurrencyTable {
    /// All supported currencies, USD first
    pub fn all() -> &'static [CurrencyInfo] {
        &CURRENCIES
    }

    /// Look up a currency by code. Input is trimmed and case-folded;
    /// unknown codes return `None`.
    pub fn lookup(code: &str) -> Option<&'static CurrencyInfo> {
        let code = code.trim().to_uppercase();
        CURRENCIES.iter().find(|c| c.code == code)
    }

    pub fn usd() -> &'static CurrencyInfo {
        &CURRENCIES[0]
    }
}
