//! Stripe Checkout Integration
//!
//! Creates Checkout Sessions (hosted redirect or embedded) and PaymentIntents
//! behind the [`PaymentGateway`] trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, CheckoutSessionUiMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, CreatePaymentIntent,
    CreatePaymentIntentAutomaticPaymentMethods, Currency, PaymentIntent,
};

use crate::catalog::{BillingInterval, Plan, PlanCatalog};
use crate::error::{PaymentError, Result};

/// How the customer completes a Checkout Session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFlow {
    /// Full redirect to Stripe's hosted page
    Redirect,
    /// Inline iframe mounted with the session's client secret
    Embedded,
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Plan to purchase
    pub plan: Plan,

    /// ISO currency code, uppercase
    pub currency: String,

    /// Price in the currency's minor units
    pub unit_amount: i64,

    /// Prefills the email field on the payment page
    #[serde(default)]
    pub customer_email: Option<String>,

    pub flow: CheckoutFlow,

    /// Redirect flow: where Stripe sends the customer after paying
    pub success_url: String,

    /// Redirect flow: where Stripe sends the customer on cancel
    pub cancel_url: String,

    /// Embedded flow: where Stripe navigates once payment finishes
    pub return_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// Hosted page URL (redirect flow)
    pub url: Option<String>,

    /// Client secret for mounting embedded checkout
    pub client_secret: Option<String>,

    pub flow: CheckoutFlow,
}

/// Request to create a one-off PaymentIntent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub plan: Plan,

    /// ISO currency code, uppercase
    pub currency: String,

    /// Amount in the currency's minor units
    pub amount: i64,
}

/// Result of creating a PaymentIntent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentIntentSession {
    pub id: String,
    pub client_secret: String,
}

/// What a checkout line item charges
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineItemSpec {
    /// The plan's catalog price, used as-is
    CatalogPrice { price_id: String },

    /// Inline price against the plan's product (localized amount)
    Custom {
        product_id: String,
        currency: String,
        unit_amount: i64,
        interval: BillingInterval,
    },
}

impl LineItemSpec {
    /// Use the catalog price when the customer pays the USD catalog amount;
    /// anything else is priced inline against the plan's product.
    pub fn resolve(catalog: &PlanCatalog, plan: Plan, currency: &str, unit_amount: i64) -> Self {
        let entry = catalog.entry(plan);
        if currency.eq_ignore_ascii_case("USD") && unit_amount == entry.usd_cents {
            Self::CatalogPrice {
                price_id: entry.price_id.clone(),
            }
        } else {
            Self::Custom {
                product_id: entry.product_id.clone(),
                currency: currency.to_uppercase(),
                unit_amount,
                interval: entry.billing,
            }
        }
    }
}

/// Payment provider seam (Strategy pattern)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a Checkout Session for a plan
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Create a PaymentIntent for a plan
    async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntentSession>;

    /// Gateway name
    fn name(&self) -> &str;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    catalog: PlanCatalog,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, catalog: PlanCatalog) -> Self {
        Self {
            client: Client::new(secret_key),
            catalog,
        }
    }

    /// Create from environment variables
    pub fn from_env(catalog: PlanCatalog) -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        Ok(Self::new(secret_key.trim(), catalog))
    }
}

/// Map an ISO code onto Stripe's currency enum
fn stripe_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.trim().to_lowercase()))
        .map_err(|_| PaymentError::UnsupportedCurrency(code.to_string()))
}

fn tracking_metadata(plan: Plan, currency: &str) -> HashMap<String, String> {
    HashMap::from([
        ("plan".to_string(), plan.as_str().to_string()),
        ("currency".to_string(), currency.to_uppercase()),
    ])
}

fn line_item(spec: LineItemSpec) -> Result<CreateCheckoutSessionLineItems> {
    let item = match spec {
        LineItemSpec::CatalogPrice { price_id } => CreateCheckoutSessionLineItems {
            price: Some(price_id),
            quantity: Some(1),
            ..Default::default()
        },
        LineItemSpec::Custom {
            product_id,
            currency,
            unit_amount,
            interval,
        } => {
            let recurring = match interval {
                BillingInterval::Month => Some(CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month),
                BillingInterval::Year => Some(CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year),
                BillingInterval::OneTime => None,
            }
            .map(|interval| CreateCheckoutSessionLineItemsPriceDataRecurring {
                interval,
                interval_count: Some(1),
            });

            CreateCheckoutSessionLineItems {
                quantity: Some(1),
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: stripe_currency(&currency)?,
                    product: Some(product_id),
                    unit_amount: Some(unit_amount),
                    recurring,
                    ..Default::default()
                }),
                ..Default::default()
            }
        }
    };
    Ok(item)
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        if request.unit_amount <= 0 {
            return Err(PaymentError::InvalidAmount(request.unit_amount.to_string()));
        }

        let spec = LineItemSpec::resolve(&self.catalog, request.plan, &request.currency, request.unit_amount);
        tracing::debug!(plan = %request.plan, spec = ?spec, flow = ?request.flow, "Resolved checkout line item");

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(if request.plan.is_recurring() {
            CheckoutSessionMode::Subscription
        } else {
            CheckoutSessionMode::Payment
        });
        params.customer_email = request.customer_email.as_deref();
        params.metadata = Some(tracking_metadata(request.plan, &request.currency));
        params.line_items = Some(vec![line_item(spec)?]);

        match request.flow {
            CheckoutFlow::Embedded => {
                params.ui_mode = Some(CheckoutSessionUiMode::Embedded);
                params.return_url = Some(&request.return_url);
            }
            CheckoutFlow::Redirect => {
                params.success_url = Some(&request.success_url);
                params.cancel_url = Some(&request.cancel_url);
            }
        }

        let session = StripeCheckoutSession::create(&self.client, params).await?;

        let created = CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
            client_secret: session.client_secret,
            flow: request.flow,
        };

        match request.flow {
            CheckoutFlow::Embedded if created.client_secret.is_none() => {
                Err(PaymentError::Stripe("No client secret returned".into()))
            }
            CheckoutFlow::Redirect if created.url.is_none() => {
                Err(PaymentError::Stripe("No checkout URL returned".into()))
            }
            _ => {
                tracing::info!(
                    session_id = %created.id,
                    plan = %request.plan,
                    currency = %request.currency,
                    amount = request.unit_amount,
                    "Created checkout session"
                );
                Ok(created)
            }
        }
    }

    async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntentSession> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidAmount(request.amount.to_string()));
        }

        let mut params = CreatePaymentIntent::new(request.amount, stripe_currency(&request.currency)?);
        params.metadata = Some(tracking_metadata(request.plan, &request.currency));
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            allow_redirects: None,
        });

        let intent = PaymentIntent::create(&self.client, params).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))?;

        tracing::info!(
            payment_intent = %intent.id,
            plan = %request.plan,
            currency = %request.currency,
            amount = request.amount,
            "Created payment intent"
        );

        Ok(PaymentIntentSession {
            id: intent.id.to_string(),
            client_secret,
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_catalog_amount_uses_price_id() {
        let catalog = PlanCatalog::default();
        for plan in Plan::all() {
            let spec = LineItemSpec::resolve(&catalog, plan, "usd", catalog.usd_cents(plan));
            assert_eq!(
                spec,
                LineItemSpec::CatalogPrice {
                    price_id: catalog.price_id(plan).to_string()
                }
            );
        }
    }

    #[test]
    fn test_localized_amount_uses_product() {
        let catalog = PlanCatalog::default();
        let spec = LineItemSpec::resolve(&catalog, Plan::Yearly, "eur", 9100);
        assert_eq!(
            spec,
            LineItemSpec::Custom {
                product_id: catalog.product_id(Plan::Yearly).to_string(),
                currency: "EUR".into(),
                unit_amount: 9100,
                interval: BillingInterval::Year,
            }
        );

        let lifetime = LineItemSpec::resolve(&catalog, Plan::Lifetime, "JPY", 29850);
        assert!(matches!(
            lifetime,
            LineItemSpec::Custom { interval: BillingInterval::OneTime, .. }
        ));
    }

    #[test]
    fn test_stripe_currency_mapping() {
        assert_eq!(stripe_currency("EUR").unwrap(), Currency::EUR);
        assert_eq!(stripe_currency(" jpy ").unwrap(), Currency::JPY);
        assert!(stripe_currency("nope").is_err());
    }

    #[test]
    fn test_tracking_metadata() {
        let metadata = tracking_metadata(Plan::MonthlyYearly, "eur");
        assert_eq!(metadata["plan"], "monthly-yearly");
        assert_eq!(metadata["currency"], "EUR");
    }
}
