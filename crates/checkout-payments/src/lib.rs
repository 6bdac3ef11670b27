//! # checkout-payments
//!
//! Plan catalog and Stripe integration for the checkout flow.
//!
//! ## Checkout flows
//!
//! Both Stripe Checkout flows are created from the same [`CheckoutRequest`];
//! only the [`CheckoutFlow`] differs.
//!
//! ### Redirect (hosted page)
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │  Checkout   │────▶│  Stripe Hosted  │────▶│  /success   │
//! │    page     │ url │  Checkout Page  │     │             │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//! ```
//!
//! ### Embedded
//!
//! The session is created with `ui_mode=embedded`; the page mounts Stripe's
//! iframe using the returned `client_secret` and Stripe navigates to the
//! `return_url` when payment finishes.
//!
//! One-off charges outside Checkout go through a PaymentIntent and the
//! Payment Element instead.
//!
//! ## Plans
//!
//! [`PlanCatalog`] is the single table binding each [`Plan`] to its Stripe
//! price and product. Every route reads it; nothing else hard-codes IDs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{CheckoutFlow, CheckoutRequest, PaymentGateway, Plan, StripeClient};
//!
//! let stripe = StripeClient::from_env(PlanCatalog::from_env())?;
//! let session = stripe.create_checkout_session(CheckoutRequest {
//!     plan: Plan::Yearly,
//!     currency: "EUR".into(),
//!     unit_amount: 9100,
//!     customer_email: None,
//!     flow: CheckoutFlow::Embedded,
//!     success_url: "https://example.com/success".into(),
//!     cancel_url: "https://example.com/checkout".into(),
//!     return_url: "https://example.com/success?session_id={CHECKOUT_SESSION_ID}".into(),
//! }).await?;
//! ```

mod catalog;
mod checkout;
mod error;
mod selection;
mod webhook;

pub use catalog::{BillingInterval, Plan, PlanCatalog, PlanEntry};
pub use checkout::{
    CheckoutFlow, CheckoutRequest, CheckoutSession, LineItemSpec, PaymentGateway,
    PaymentIntentRequest, PaymentIntentSession, StripeClient,
};
pub use error::{PaymentError, Result};
pub use selection::{MemorySelectionStore, PlanSelection, SelectionStore};
pub use webhook::{
    EventData, SIGNATURE_TOLERANCE_SECS, StripeEvent, WebhookHandler, WebhookOutcome, parse_event,
    sign_payload, verify_signature,
};
