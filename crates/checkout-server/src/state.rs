//! Application State

use std::sync::Arc;

use assistant_core::Assistant;
use checkout_currency::RateSource;
use checkout_payments::{PaymentGateway, PlanCatalog, SelectionStore};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Plan → price/product table shared by every route
    pub catalog: Arc<PlanCatalog>,

    /// Payment provider (optional - None if not configured)
    pub gateway: Option<Arc<dyn PaymentGateway>>,

    /// Exchange rates (static table or cached live feed)
    pub rates: Arc<dyn RateSource>,

    /// Plan selections recorded from webhooks
    pub selections: Arc<dyn SelectionStore>,

    /// Chat assistant (optional - None if no completion API key)
    pub assistant: Option<Arc<Assistant>>,

    pub config: Arc<ServerConfig>,
}
