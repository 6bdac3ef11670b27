//! Exchange Rate Sources
//!
//! Abstractions over where USD exchange rates come from.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CurrencyError, Result};
use crate::model::{CurrencyInfo, CurrencyTable};

/// How long a fetched snapshot stays valid
pub const RATE_CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// How long fallback rates are served after a failed fetch
pub const FAILED_FETCH_RETRY: Duration = Duration::from_secs(60);

/// A set of rates against USD at a point in time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base: String,
    pub rates: HashMap<String, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Snapshot built from the built-in currency table
    pub fn from_table() -> Self {
        Self {
            base: "USD".into(),
            rates: CurrencyTable::all()
                .iter()
                .map(|c| (c.code.to_string(), c.usd_rate))
                .collect(),
            fetched_at: Utc::now(),
        }
    }

    /// Rate for `currency`, falling back to its built-in rate when the
    /// snapshot has no usable entry
    pub fn rate_for(&self, currency: &CurrencyInfo) -> Decimal {
        self.rates
            .get(currency.code)
            .copied()
            .filter(|r| *r > Decimal::ZERO)
            .unwrap_or(currency.usd_rate)
    }
}

/// Rate source trait (Strategy pattern)
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Current rates against USD
    async fn snapshot(&self) -> Result<RateSnapshot>;

    /// Rate for a single currency. Never fails: any error falls back to the
    /// built-in rate.
    async fn rate(&self, currency: &CurrencyInfo) -> Decimal {
        if currency.is_usd() {
            return Decimal::ONE;
        }
        match self.snapshot().await {
            Ok(snapshot) => snapshot.rate_for(currency),
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "Rate lookup failed, using built-in rate");
                currency.usd_rate
            }
        }
    }

    /// Source name
    fn name(&self) -> &str;
}

/// Built-in rate table
#[derive(Default)]
pub struct StaticRates;

impl StaticRates {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RateSource for StaticRates {
    async fn snapshot(&self) -> Result<RateSnapshot> {
        Ok(RateSnapshot::from_table())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Live rate feed with a 12 hour cache
///
/// Expects an open exchange-rate style endpoint: `GET {base_url}/latest/USD`
/// answering `{"result": "success", "rates": {"EUR": 0.92, ...}}`.
pub struct LiveRates {
    client: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedSnapshot>>,
}

struct CachedSnapshot {
    snapshot: RateSnapshot,
    /// `None` when the lifetime overflows `Instant`
    expires_at: Option<Instant>,
}

impl CachedSnapshot {
    fn new(snapshot: RateSnapshot, valid_for: Duration) -> Self {
        Self {
            snapshot,
            expires_at: Instant::now().checked_add(valid_for),
        }
    }

    fn is_valid(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Deserialize)]
struct FeedResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

impl LiveRates {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl: RATE_CACHE_TTL,
            cache: RwLock::new(None),
        }
    }

    /// Create from `EXCHANGE_RATES_URL`; `None` when unset
    pub fn from_env() -> Option<Self> {
        std::env::var("EXCHANGE_RATES_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    /// Override the cache lifetime
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn fetch(&self) -> Result<RateSnapshot> {
        let url = format!("{}/latest/USD", self.base_url);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_feed(&body)
    }
}

/// Parse a feed response body into a snapshot
fn parse_feed(body: &str) -> Result<RateSnapshot> {
    let feed: FeedResponse = serde_json::from_str(body)?;

    if let Some(result) = feed.result.as_deref() {
        if result != "success" {
            return Err(CurrencyError::Feed(format!("feed returned result={result}")));
        }
    }
    if feed.rates.is_empty() {
        return Err(CurrencyError::Feed("feed returned no rates".into()));
    }

    let rates = feed
        .rates
        .into_iter()
        .filter_map(|(code, rate)| Decimal::from_f64(rate).map(|r| (code.to_uppercase(), r)))
        .collect();

    Ok(RateSnapshot {
        base: "USD".into(),
        rates,
        fetched_at: Utc::now(),
    })
}

#[async_trait]
impl RateSource for LiveRates {
    async fn snapshot(&self) -> Result<RateSnapshot> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_valid(Instant::now()) {
                return Ok(cached.snapshot.clone());
            }
        }

        // One fetch at a time; whoever waited on the lock reuses its result
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid(Instant::now()) {
                return Ok(cached.snapshot.clone());
            }
        }

        let (snapshot, valid_for) = match self.fetch().await {
            Ok(snapshot) => {
                tracing::info!(rates = snapshot.rates.len(), "Fetched live exchange rates");
                (snapshot, self.ttl)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_secs = FAILED_FETCH_RETRY.as_secs(),
                    "Live rate fetch failed, serving fallback rates"
                );
                let fallback = cache
                    .take()
                    .map_or_else(RateSnapshot::from_table, |cached| cached.snapshot);
                (fallback, FAILED_FETCH_RETRY)
            }
        };

        *cache = Some(CachedSnapshot::new(snapshot.clone(), valid_for));
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "live"
    }
}
