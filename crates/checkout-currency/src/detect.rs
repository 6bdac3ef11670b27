//! Currency Detection
//!
//! Picks a customer's currency from what the edge tells us about them: a
//! geo-IP country header first, then the region of their preferred language.

use crate::model::{CurrencyInfo, CurrencyTable};

/// Headers set by CDNs / hosts carrying the visitor's ISO country code
pub const COUNTRY_HEADERS: [&str; 3] = ["x-vercel-ip-country", "cf-ipcountry", "x-country-code"];

const EURO_AREA: [&str; 20] = [
    "AT", "BE", "HR", "CY", "EE", "FI", "FR", "DE", "GR", "IE", "IT", "LV", "LT", "LU", "MT", "NL",
    "PT", "SK", "SI", "ES",
];

/// Currency used in a country, if we sell in it
pub fn currency_for_country(country: &str) -> Option<&'static CurrencyInfo> {
    let country = country.trim().to_uppercase();
    if EURO_AREA.contains(&country.as_str()) {
        return CurrencyTable::lookup("EUR");
    }

    let code = match country.as_str() {
        "US" | "PR" | "EC" | "SV" | "PA" => "USD",
        "GB" | "UK" => "GBP",
        "CA" => "CAD",
        "AU" => "AUD",
        "NZ" => "NZD",
        "CH" | "LI" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "TR" => "TRY",
        "IN" => "INR",
        "BR" => "BRL",
        "MX" => "MXN",
        "SG" => "SGD",
        "HK" => "HKD",
        "CN" => "CNY",
        "ZA" => "ZAR",
        "AE" => "AED",
        "PH" => "PHP",
        "TH" => "THB",
        "ID" => "IDR",
        "JP" => "JPY",
        "KR" => "KRW",
        "VN" => "VND",
        "CL" => "CLP",
        _ => return None,
    };
    CurrencyTable::lookup(code)
}

/// Region subtags from an `Accept-Language` value, in preference order.
/// `"fr-CA,fr;q=0.9,en-US;q=0.8"` yields `["CA", "US"]`.
fn language_regions(accept_language: &str) -> Vec<String> {
    let mut tagged: Vec<(f32, usize, String)> = accept_language
        .split(',')
        .enumerate()
        .filter_map(|(idx, entry)| {
            let mut parts = entry.trim().split(';');
            let tag = parts.next()?.trim();
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            let region = tag
                .split(['-', '_'])
                .skip(1)
                .find(|sub| sub.len() == 2 && sub.chars().all(|c| c.is_ascii_alphabetic()))?;
            Some((quality, idx, region.to_uppercase()))
        })
        .collect();

    tagged.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    tagged.into_iter().map(|(_, _, region)| region).collect()
}

/// Detect the customer's currency. Falls back to USD.
pub fn detect_currency(country: Option<&str>, accept_language: Option<&str>) -> &'static CurrencyInfo {
    if let Some(currency) = country
        .filter(|c| !c.trim().is_empty() && !c.eq_ignore_ascii_case("XX"))
        .and_then(currency_for_country)
    {
        return currency;
    }

    accept_language
        .map(language_regions)
        .unwrap_or_default()
        .iter()
        .find_map(|region| currency_for_country(region))
        .unwrap_or_else(CurrencyTable::usd)
}
