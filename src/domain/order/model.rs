use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{LineItem, OrderStatus};

// ============================================================================
// Order Record
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub tracking_id: String,

    // Customer
    pub customer_name: String,
    pub customer_phone: String,

    // Contents (fixed at creation, total is never recomputed for display)
    pub items: Vec<LineItem>,
    pub total_amount: f64,

    // Lifecycle
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(customer_name: String, customer_phone: String, items: Vec<LineItem>) -> Self {
        let total_amount = total_of(&items);
        Self {
            tracking_id: generate_tracking_id(),
            customer_name,
            customer_phone,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Sum of qty x price over all line items.
pub fn total_of(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::subtotal).sum()
}

/// "TID" + epoch millis + 4-digit random suffix + process-wide sequence.
///
/// The millisecond component keeps ids roughly time-ordered and the random
/// suffix separates ids minted by different processes. Neither is enough on
/// its own inside a single millisecond, so a monotonic counter is appended:
/// it never repeats for the lifetime of the process, which makes every id
/// distinct no matter how fast callers create orders.
pub fn generate_tracking_id() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let millis = Utc::now().timestamp_millis();
    let suffix = 1000 + (Uuid::new_v4().as_u128() % 9000) as u16;
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("TID{}{}{}", millis, suffix, seq)
}

// ============================================================================
// Unit Tests
// ============================================================================
