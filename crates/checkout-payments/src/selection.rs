//! Plan Selection Records
//!
//! Completed checkouts reported by the webhook, kept so the rest of the
//! system can see which plan a customer ended up with.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Plan;
use crate::error::{PaymentError, Result};

/// A completed plan purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSelection {
    /// Checkout Session ID
    pub session_id: String,

    /// Plan from the session metadata (`None` if missing or unknown)
    pub plan: Option<Plan>,

    /// ISO currency code, uppercase
    pub currency: Option<String>,

    /// Total charged, in minor units
    pub amount_total: Option<i64>,

    pub customer_email: Option<String>,

    /// Stripe payment status (`paid`, `unpaid`, `no_payment_required`)
    pub payment_status: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

/// Storage for plan selections
pub trait SelectionStore: Send + Sync {
    /// Record a selection. Recording the same session twice keeps the first.
    fn record(&self, selection: PlanSelection) -> Result<bool>;

    /// Look up by Checkout Session ID
    fn get(&self, session_id: &str) -> Result<Option<PlanSelection>>;
}

/// Bounded in-memory store (newest entries kept)
pub struct MemorySelectionStore {
    selections: RwLock<VecDeque<PlanSelection>>,
    capacity: usize,
}

impl Default for MemorySelectionStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemorySelectionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            selections: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn poisoned<T>(_: T) -> PaymentError {
        PaymentError::Storage("selection store lock poisoned".into())
    }
}

impl SelectionStore for MemorySelectionStore {
    fn record(&self, selection: PlanSelection) -> Result<bool> {
        let mut selections = self.selections.write().map_err(Self::poisoned)?;

        if selections.iter().any(|s| s.session_id == selection.session_id) {
            return Ok(false);
        }

        selections.push_back(selection);
        while selections.len() > self.capacity {
            selections.pop_front();
        }
        Ok(true)
    }

    fn get(&self, session_id: &str) -> Result<Option<PlanSelection>> {
        let selections = self.selections.read().map_err(Self::poisoned)?;
        Ok(selections.iter().find(|s| s.session_id == session_id).cloned())
    }
}
