//! Plan checkout HTTP Server
//!
//! Axum-based server for Stripe Checkout (hosted and embedded), one-off
//! PaymentIntents, Stripe webhooks, localized plan pricing and the chat
//! assistant.

mod config;
mod error;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assistant_core::{Assistant, AssistantConfig};
use assistant_runtime::GeminiProvider;
use checkout_currency::{LiveRates, RateSource, StaticRates};
use checkout_payments::{MemorySelectionStore, PaymentGateway, PlanCatalog, StripeClient};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let catalog = PlanCatalog::from_env();

    for entry in catalog.entries() {
        tracing::info!("  Plan {:<15} {} ({})", entry.plan.as_str(), entry.price_id, entry.product_id);
    }

    // Initialize payments
    let gateway: Option<Arc<dyn PaymentGateway>> = match StripeClient::from_env(catalog.clone()) {
        Ok(stripe) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(stripe))
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - payments disabled ({})", e);
            tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
            None
        }
    };
    if config.webhook_secret.is_none() {
        tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhooks disabled");
    }

    // Exchange rates
    let rates: Arc<dyn RateSource> = match LiveRates::from_env() {
        Some(live) => {
            tracing::info!("✓ Live exchange rates enabled (cached 12h)");
            Arc::new(live)
        }
        None => {
            tracing::info!("Using built-in exchange rates");
            Arc::new(StaticRates::new())
        }
    };

    // Initialize assistant
    let assistant = match GeminiProvider::from_env() {
        Ok(provider) => {
            let mut assistant_config = AssistantConfig::default();
            if let Some(model) = provider.configured_model() {
                assistant_config = assistant_config.with_default_model(model);
            }
            tracing::info!("✓ Assistant configured (default model {})", assistant_config.default_model);
            Some(Arc::new(Assistant::new(Arc::new(provider), assistant_config)))
        }
        Err(e) => {
            tracing::warn!("⚠ Assistant disabled ({})", e);
            None
        }
    };

    // Build application state
    let state = AppState {
        catalog: Arc::new(catalog),
        gateway,
        rates,
        selections: Arc::new(MemorySelectionStore::default()),
        assistant,
        config: Arc::new(config.clone()),
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  GET  /api/currency                 - Detected currency + plan prices");
    tracing::info!("  GET  /api/selections/{{id}}          - Recorded plan selection");
    tracing::info!("  POST /api/create-checkout-session  - Stripe Checkout (redirect/embedded)");
    tracing::info!("  POST /api/create-payment-intent    - Stripe PaymentIntent");
    tracing::info!("  POST /api/webhook                  - Stripe webhook");
    tracing::info!("  POST /api/gemini                   - Chat assistant");
    tracing::info!("  (POST routes also under /.netlify/functions/)");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
