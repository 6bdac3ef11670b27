//! HTTP Handlers

use std::ops::RangeInclusive;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::HeaderMap,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assistant_core::{AssistantError, HistoryEntry};
use checkout_currency::{
    CurrencyInfo, CurrencyTable, Price, convert, detect::COUNTRY_HEADERS, detect_currency, format_price,
    to_minor_units,
};
use checkout_payments::{
    BillingInterval, CheckoutFlow, CheckoutRequest, PaymentIntentRequest, Plan, PlanSelection,
    WebhookHandler, parse_event,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Header value that selects the embedded checkout flow
const EMBEDDED_CHECKOUT: &str = "embedded-checkout";

/// How far above the server quote a client-computed amount may land
const OVERPAY_TOLERANCE_PERCENT: i64 = 25;

// ============================================================================
// Request / Response Types
// ============================================================================

/// An amount as clients send it: a JSON number or a numeric string
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(f64),
    Text(String),
}

impl AmountField {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionBody {
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub user_currency: Option<String>,
    /// Price the page showed, in major units of `user_currency`
    #[serde(default)]
    pub converted_amount: Option<AmountField>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentBody {
    /// USD cents
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub converted_amount: Option<AmountField>,
    #[serde(default)]
    pub user_currency: Option<String>,
    #[serde(default)]
    pub plan_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyQuery {
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencySummary {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuote {
    pub plan_type: Plan,
    pub name: String,
    pub billing: BillingInterval,
    pub price: Price,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyResponse {
    pub currency: CurrencySummary,
    /// Whether the currency came from request headers rather than `?currency=`
    pub detected: bool,
    pub rate: Decimal,
    pub rate_source: String,
    pub plans: Vec<PlanQuote>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
    pub webhook_configured: bool,
    pub assistant_provider: Option<String>,
    pub assistant_connected: bool,
    pub rate_source: String,
}

// ============================================================================
// Input sanitization
// ============================================================================

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::bad_request("Invalid request body.")
    })
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn require_plan(raw: Option<&str>) -> Result<Plan, ApiError> {
    let raw = non_empty(raw).ok_or_else(|| ApiError::bad_request("Missing required field: planType"))?;
    Plan::parse(raw).ok_or_else(|| {
        tracing::warn!(plan = raw, "Unknown plan type");
        ApiError::bad_request("Invalid plan type.")
    })
}

/// Absent currency means USD; anything we don't sell in is rejected
fn require_currency(raw: Option<&str>) -> Result<&'static CurrencyInfo, ApiError> {
    match non_empty(raw) {
        None => Ok(CurrencyTable::usd()),
        Some(code) => CurrencyTable::lookup(code).ok_or_else(|| {
            tracing::warn!(currency = code, "Unsupported currency");
            ApiError::bad_request("Invalid currency.")
        }),
    }
}

fn sanitize_email(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(email) if email.contains('@') && !email.contains(char::is_whitespace) => {
            Ok(Some(email.to_string()))
        }
        Some(_) => Err(ApiError::bad_request("Invalid email address.")),
    }
}

fn converted_minor_units(field: &AmountField, currency: &CurrencyInfo) -> Result<i64, ApiError> {
    let value = field.value().ok_or_else(|| ApiError::bad_request("Invalid amount."))?;
    Ok(to_minor_units(value, currency)?)
}

/// USD cents as sent in `amount`
fn usd_cents(field: &AmountField) -> Result<i64, ApiError> {
    field
        .value()
        .filter(|v| v.is_finite() && *v >= 1.0 && v.fract() == 0.0 && *v < 1e12)
        .map(|v| v as i64)
        .ok_or_else(|| ApiError::bad_request("Invalid amount."))
}

/// Server-side price for a plan in a currency, with the amounts a client
/// may submit for it
struct Quote {
    price: Price,
    accepted: RangeInclusive<i64>,
}

async fn quote(state: &AppState, plan: Plan, currency: &CurrencyInfo) -> Quote {
    let usd_cents = state.catalog.usd_cents(plan);
    let rate = state.rates.rate(currency).await;
    let price = convert(usd_cents, currency, rate, plan.rounding());

    if currency.is_usd() {
        let exact = price.minor_units;
        return Quote { price, accepted: exact..=exact };
    }

    // Pages may price with the built-in table while we hold live rates
    let table = convert(usd_cents, currency, currency.usd_rate, plan.rounding());
    let floor = price.minor_units.min(table.minor_units);
    let high = price.minor_units.max(table.minor_units);
    let ceiling = high.saturating_add(high.saturating_mul(OVERPAY_TOLERANCE_PERCENT) / 100);

    Quote {
        price,
        accepted: floor..=ceiling,
    }
}

/// Accept a client amount only when it falls inside the quoted range; the
/// quote is the charge when the client sent none.
fn reconcile_amount(submitted: Option<i64>, quote: &Quote) -> Result<i64, ApiError> {
    let Some(submitted) = submitted else {
        return Ok(quote.price.minor_units);
    };

    if !quote.accepted.contains(&submitted) {
        tracing::warn!(
            submitted,
            quoted = quote.price.minor_units,
            floor = *quote.accepted.start(),
            currency = quote.price.currency,
            "Client amount does not match quote"
        );
        return Err(ApiError::bad_request("Amount does not match the selected plan."));
    }
    Ok(submitted)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn wants_embedded(headers: &HeaderMap) -> bool {
    header_str(headers, "x-requested-from").is_some_and(|v| v.trim().eq_ignore_ascii_case(EMBEDDED_CHECKOUT))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let assistant_connected = match state.assistant.as_ref() {
        Some(assistant) => assistant.is_healthy().await,
        None => false,
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.gateway.is_some(),
        webhook_configured: state.config.webhook_secret.is_some(),
        assistant_provider: state.assistant.as_ref().map(|a| a.provider_name().to_string()),
        assistant_connected,
        rate_source: state.rates.name().to_string(),
    })
}

/// Create a Stripe Checkout Session (hosted redirect or embedded)
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutSessionBody>, JsonRejection>,
) -> Result<Json<CheckoutSessionResponse>, ApiError> {
    let body = json_body(payload)?;

    let plan = require_plan(body.plan_type.as_deref())?;
    let currency = require_currency(body.user_currency.as_deref())?;
    let customer_email = sanitize_email(body.email.as_deref())?;
    let submitted = body
        .converted_amount
        .as_ref()
        .map(|a| converted_minor_units(a, currency))
        .transpose()?;

    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Payments are not configured.".into()))?;

    let quoted = quote(&state, plan, currency).await;
    let unit_amount = reconcile_amount(submitted, &quoted)?;
    let flow = if wants_embedded(&headers) {
        CheckoutFlow::Embedded
    } else {
        CheckoutFlow::Redirect
    };

    let request = CheckoutRequest {
        plan,
        currency: currency.code.to_string(),
        unit_amount,
        customer_email,
        flow,
        success_url: state.config.success_url(),
        cancel_url: state.config.cancel_url(),
        return_url: state.config.return_url(),
    };

    let session = gateway
        .create_checkout_session(request)
        .await
        .map_err(|e| ApiError::payment("Error creating checkout session", &e))?;

    tracing::info!(
        session_id = %session.id,
        plan = %plan,
        currency = currency.code,
        unit_amount,
        flow = ?flow,
        "Checkout session created"
    );

    Ok(Json(match flow {
        CheckoutFlow::Embedded => CheckoutSessionResponse {
            url: None,
            client_secret: session.client_secret,
            session_id: session.id,
        },
        CheckoutFlow::Redirect => CheckoutSessionResponse {
            url: session.url,
            client_secret: None,
            session_id: session.id,
        },
    }))
}

/// Create a PaymentIntent for the Payment Element
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<PaymentIntentBody>, JsonRejection>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let body = json_body(payload)?;

    let plan = require_plan(body.plan_type.as_deref())?;
    let currency = require_currency(body.user_currency.as_deref())?;
    let submitted = match (&body.converted_amount, &body.amount) {
        (Some(converted), _) => Some(converted_minor_units(converted, currency)?),
        (None, Some(amount)) if currency.is_usd() => Some(usd_cents(amount)?),
        _ => None,
    };

    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Payments are not configured.".into()))?;

    let quoted = quote(&state, plan, currency).await;
    let amount = reconcile_amount(submitted, &quoted)?;

    let intent = gateway
        .create_payment_intent(PaymentIntentRequest {
            plan,
            currency: currency.code.to_string(),
            amount,
        })
        .await
        .map_err(|e| ApiError::payment("Error creating payment intent", &e))?;

    tracing::info!(payment_intent = %intent.id, plan = %plan, currency = currency.code, amount, "PaymentIntent created");

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
        id: intent.id,
    }))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Webhooks are not configured.".into()))?;

    let signature = header_str(&headers, "stripe-signature")
        .ok_or_else(|| ApiError::bad_request("Webhook Error: missing Stripe-Signature header"))?;

    let event = parse_event(&body, signature, secret).map_err(|e| {
        tracing::warn!("Webhook signature failed: {}", e);
        ApiError::bad_request(format!("Webhook Error: {e}"))
    })?;

    let handler = WebhookHandler::new(state.selections.clone());
    let outcome = handler
        .handle(&event)
        .map_err(|e| ApiError::payment("Webhook processing failed", &e))?;
    tracing::debug!(event_id = %event.id, outcome = ?outcome, "Webhook handled");

    Ok(Json(WebhookResponse { received: true }))
}

/// Chat assistant proxy
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let body = json_body(payload)?;
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let assistant = state.assistant.as_ref().ok_or_else(|| {
        ApiError::Unavailable(AssistantError::Config("assistant disabled".into()).user_message())
    })?;

    let history = body.history.unwrap_or_default();
    let text = assistant
        .reply(&body.message, &history, body.model_name.as_deref())
        .await
        .map_err(|e| ApiError::assistant(&e))?;

    Ok(Json(ChatResponse { text }))
}

/// Detected currency and localized prices for every plan
pub async fn currency_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CurrencyQuery>,
) -> Result<Json<CurrencyResponse>, ApiError> {
    let requested = non_empty(query.currency.as_deref());
    let currency = match requested {
        Some(code) => require_currency(Some(code))?,
        None => {
            let country = COUNTRY_HEADERS.iter().find_map(|name| header_str(&headers, name));
            detect_currency(country, header_str(&headers, "accept-language"))
        }
    };

    let rate = state.rates.rate(currency).await;
    let plans = state
        .catalog
        .entries()
        .iter()
        .map(|entry| {
            let price = convert(entry.usd_cents, currency, rate, entry.plan.rounding());
            PlanQuote {
                plan_type: entry.plan,
                name: entry.name.clone(),
                billing: entry.billing,
                formatted: format_price(&price, currency),
                price,
            }
        })
        .collect();

    Ok(Json(CurrencyResponse {
        currency: CurrencySummary {
            code: currency.code,
            name: currency.name,
            symbol: currency.symbol,
            decimals: currency.decimals,
        },
        detected: requested.is_none(),
        rate,
        rate_source: state.rates.name().to_string(),
        plans,
    }))
}

/// Plan selection recorded for a completed Checkout Session
pub async fn get_selection(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PlanSelection>, ApiError> {
    state
        .selections
        .get(session_id.trim())
        .map_err(|e| ApiError::payment("Failed to read plan selection", &e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Selection not found".into()))
}
