use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub qty: u32,
    pub price: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.qty) * self.price
    }
}

/// Three-stage order lifecycle. The wire strings match what the dashboard
/// renders, so they carry a space rather than the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// Position in the forward-only lifecycle.
    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::OutForDelivery => 1,
            OrderStatus::Delivered => 2,
        }
    }

    /// Transitions only move forward. Skipping a stage is allowed
    /// (Pending straight to Delivered); same-status and backward moves
    /// are not.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    /// Case-insensitive: the admin UI historically sent mixed casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "out for delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            _ => Err(()),
        }
    }
}

/// Lenient numeric coercion for quantities and prices arriving over the
/// wire or out of legacy records: accepts a JSON number or a numeric
/// string, anything else is treated as absent.
pub fn lenient_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
