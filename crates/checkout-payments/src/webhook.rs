//! Stripe Webhook Handling
//!
//! Verifies `Stripe-Signature` headers and records the outcome of checkout
//! events. Event types are only looked at after the signature checks out.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::catalog::Plan;
use crate::error::{PaymentError, Result};
use crate::selection::{PlanSelection, SelectionStore};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Compute the `v1` signature Stripe would send for `payload` at `timestamp`
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`) against the
/// raw payload.
pub fn verify_signature(payload: &str, header: &str, secret: &str, now: i64, tolerance: i64) -> Result<()> {
    if secret.is_empty() {
        return Err(PaymentError::Config("webhook secret not set".into()));
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::WebhookSignature("Unable to extract timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::WebhookSignature("No signatures found".into()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());

    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|bytes| mac.clone().verify_slice(&bytes).is_ok());

    if !matched {
        return Err(PaymentError::WebhookSignature(
            "No signatures found matching the expected signature for payload".into(),
        ));
    }

    if now - timestamp > tolerance {
        return Err(PaymentError::WebhookSignature("Timestamp outside the tolerance zone".into()));
    }

    Ok(())
}

/// A verified Stripe event
#[derive(Clone, Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub data: EventData,

    #[serde(default)]
    pub created: Option<i64>,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Verify the signature, then parse the event
pub fn parse_event(payload: &str, signature: &str, secret: &str) -> Result<StripeEvent> {
    verify_signature(payload, signature, secret, Utc::now().timestamp(), SIGNATURE_TOLERANCE_SECS)?;
    serde_json::from_str(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))
}

/// What handling an event did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Checkout completed and the plan selection was recorded
    SelectionRecorded {
        session_id: String,
        plan: Option<Plan>,
        duplicate: bool,
    },

    PaymentSucceeded {
        payment_intent_id: String,
        amount: Option<i64>,
    },

    PaymentFailed {
        payment_intent_id: String,
        reason: Option<String>,
    },

    SubscriptionChanged {
        subscription_id: String,
        status: Option<String>,
        event_type: String,
    },

    /// Unhandled event type
    Ignored { event_type: String },
}

fn str_field(object: &Value, pointer: &str) -> Option<String> {
    object.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

/// Webhook handler
pub struct WebhookHandler<S: SelectionStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SelectionStore + ?Sized> WebhookHandler<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Process a verified event
    pub fn handle(&self, event: &StripeEvent) -> Result<WebhookOutcome> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Processing Stripe webhook");
        let object = &event.data.object;

        let outcome = match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session_id = str_field(object, "/id")
                    .ok_or_else(|| PaymentError::WebhookParse("Invalid checkout session data".into()))?;

                let selection = PlanSelection {
                    session_id: session_id.clone(),
                    plan: str_field(object, "/metadata/plan").and_then(|p| Plan::parse(&p)),
                    currency: str_field(object, "/currency").map(|c| c.to_uppercase()),
                    amount_total: object.get("amount_total").and_then(Value::as_i64),
                    customer_email: str_field(object, "/customer_details/email")
                        .or_else(|| str_field(object, "/customer_email")),
                    payment_status: str_field(object, "/payment_status"),
                    recorded_at: Utc::now(),
                };
                let plan = selection.plan;

                let recorded = self.store.record(selection)?;
                tracing::info!(
                    session_id = %session_id,
                    plan = ?plan,
                    duplicate = !recorded,
                    "Checkout session completed"
                );

                WebhookOutcome::SelectionRecorded {
                    session_id,
                    plan,
                    duplicate: !recorded,
                }
            }

            "payment_intent.succeeded" => {
                let payment_intent_id = str_field(object, "/id").unwrap_or_default();
                let amount = object.get("amount").and_then(Value::as_i64);
                tracing::info!(payment_intent = %payment_intent_id, amount = ?amount, "PaymentIntent succeeded");
                WebhookOutcome::PaymentSucceeded {
                    payment_intent_id,
                    amount,
                }
            }

            "payment_intent.payment_failed" => {
                let payment_intent_id = str_field(object, "/id").unwrap_or_default();
                let reason = str_field(object, "/last_payment_error/message");
                tracing::warn!(payment_intent = %payment_intent_id, reason = ?reason, "PaymentIntent failed");
                WebhookOutcome::PaymentFailed {
                    payment_intent_id,
                    reason,
                }
            }

            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => {
                let subscription_id = str_field(object, "/id").unwrap_or_default();
                let status = str_field(object, "/status");
                tracing::info!(
                    subscription_id = %subscription_id,
                    status = ?status,
                    event_type = %event.event_type,
                    "Subscription changed"
                );
                WebhookOutcome::SubscriptionChanged {
                    subscription_id,
                    status,
                    event_type: event.event_type.clone(),
                }
            }

            other => {
                tracing::debug!(event_type = %other, "Unhandled webhook event");
                WebhookOutcome::Ignored {
                    event_type: other.to_string(),
                }
            }
        };

        Ok(outcome)
    }
}
