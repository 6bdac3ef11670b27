//! Plan Catalog
//!
//! The one place plans are bound to Stripe prices and products.

use serde::{Deserialize, Serialize};

use checkout_currency::RoundingRule;

use crate::error::PaymentError;

/// Subscription plan offerings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Plan {
    Monthly,
    Yearly,
    Lifetime,
    /// Annual commitment billed monthly
    MonthlyYearly,
}

impl Plan {
    pub const fn all() -> [Self; 4] {
        [Self::Monthly, Self::Yearly, Self::Lifetime, Self::MonthlyYearly]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
            Self::MonthlyYearly => "monthly-yearly",
        }
    }

    /// Parse a client-supplied plan key. Tolerates case, surrounding
    /// whitespace and `_`/space separators; anything else is unknown.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();

        match key.as_str() {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "lifetime" => Some(Self::Lifetime),
            "monthly-yearly" | "monthlyyearly" => Some(Self::MonthlyYearly),
            _ => None,
        }
    }

    /// How converted prices for this plan are rounded
    pub const fn rounding(&self) -> RoundingRule {
        match self {
            Self::Monthly | Self::MonthlyYearly => RoundingRule::Charm99,
            Self::Yearly | Self::Lifetime => RoundingRule::WholeUnits,
        }
    }

    pub const fn billing(&self) -> BillingInterval {
        match self {
            Self::Monthly | Self::MonthlyYearly => BillingInterval::Month,
            Self::Yearly => BillingInterval::Year,
            Self::Lifetime => BillingInterval::OneTime,
        }
    }

    /// Whether checkout creates a subscription (otherwise a one-time payment)
    pub const fn is_recurring(&self) -> bool {
        !matches!(self.billing(), BillingInterval::OneTime)
    }

    /// Position in the catalog table
    const fn index(&self) -> usize {
        match self {
            Self::Monthly => 0,
            Self::Yearly => 1,
            Self::Lifetime => 2,
            Self::MonthlyYearly => 3,
        }
    }

    const fn env_suffix(&self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
            Self::Lifetime => "LIFETIME",
            Self::MonthlyYearly => "MONTHLY_YEARLY",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PaymentError::UnknownPlan(s.to_string()))
    }
}

/// Billing interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
    OneTime,
}

/// Catalog entry for one plan
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub plan: Plan,
    pub name: String,
    pub price_id: String,
    pub product_id: String,
    /// Catalog price in USD cents
    pub usd_cents: i64,
    pub billing: BillingInterval,
}

/// Plan → price/product table
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    entries: [PlanEntry; 4],
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let entry = |plan: Plan, name: &str, price_id: &str, product_id: &str, usd_cents: i64| PlanEntry {
            plan,
            name: name.into(),
            price_id: price_id.into(),
            product_id: product_id.into(),
            usd_cents,
            billing: plan.billing(),
        };

        Self {
            entries: [
                entry(
                    Plan::Monthly,
                    "Premium Monthly",
                    "price_1QmR7aKf2nLxV0monthly999",
                    "prod_RfMonthlyPremium",
                    999,
                ),
                entry(
                    Plan::Yearly,
                    "Premium Yearly",
                    "price_1QmR7bKf2nLxV0yearly9900",
                    "prod_RfYearlyPremium",
                    9900,
                ),
                entry(
                    Plan::Lifetime,
                    "Premium Lifetime",
                    "price_1QmR7cKf2nLxV0lifetime19900",
                    "prod_RfLifetimePremium",
                    19900,
                ),
                entry(
                    Plan::MonthlyYearly,
                    "Premium Annual (billed monthly)",
                    "price_1QmR7dKf2nLxV0annualmonthly799",
                    "prod_RfAnnualMonthlyPremium",
                    799,
                ),
            ],
        }
    }
}

impl PlanCatalog {
    /// Built-in table with `STRIPE_PRICE_<PLAN>` / `STRIPE_PRODUCT_<PLAN>`
    /// overrides applied
    pub fn from_env() -> Self {
        let mut catalog = Self::default();
        for entry in &mut catalog.entries {
            let suffix = entry.plan.env_suffix();
            if let Ok(price_id) = std::env::var(format!("STRIPE_PRICE_{suffix}")) {
                if !price_id.trim().is_empty() {
                    entry.price_id = price_id.trim().to_string();
                }
            }
            if let Ok(product_id) = std::env::var(format!("STRIPE_PRODUCT_{suffix}")) {
                if !product_id.trim().is_empty() {
                    entry.product_id = product_id.trim().to_string();
                }
            }
        }
        catalog
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Catalog entry for a plan. Every plan has one.
    pub const fn entry(&self, plan: Plan) -> &PlanEntry {
        &self.entries[plan.index()]
    }

    pub fn price_id(&self, plan: Plan) -> &str {
        &self.entry(plan).price_id
    }

    pub fn product_id(&self, plan: Plan) -> &str {
        &self.entry(plan).product_id
    }

    pub fn usd_cents(&self, plan: Plan) -> i64 {
        self.entry(plan).usd_cents
    }
}
