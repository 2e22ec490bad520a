use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::order::{
    generate_tracking_id, lenient_number, total_of, LineItem, Order, OrderStatus,
};

// ============================================================================
// File-Backed Order Store
// ============================================================================
//
// One JSON array of order records at a configurable path. Loads tolerate the
// legacy spreadsheet-era field spellings and encodings; saves always write
// the current schema, so the first save after a load is a one-way
// normalization pass.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted order data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub struct FileOrderStore {
    path: PathBuf,
}

impl FileOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deserialize the full collection. A missing file means no orders yet.
    ///
    /// Legacy records go through an explicit migration step: every repair
    /// (back-filled tracking id, defaulted status, unparseable item list)
    /// is logged rather than silently absorbed.
    pub async fn load_all(&self) -> Result<Vec<Order>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No order file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<OrderRecord> = serde_json::from_slice(&raw)?;
        Ok(records.into_iter().map(OrderRecord::normalize).collect())
    }

    /// Serialize and replace the full collection. The write goes to a
    /// sibling temp file first and is renamed over the target, so readers
    /// never observe a half-written file.
    pub async fn save_all(&self, orders: &[Order]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(orders)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            count = orders.len(),
            "Persisted order collection"
        );
        Ok(())
    }
}

// ============================================================================
// Legacy Record Migration
// ============================================================================

/// Decode shape for one persisted record. Accepts both the current schema
/// and the legacy spreadsheet export spellings ("Tracking ID",
/// "Order Status", bare "name"/"phone", string-encoded item lists).
#[derive(Deserialize)]
struct OrderRecord {
    #[serde(default, rename = "trackingId", alias = "Tracking ID")]
    tracking_id: Option<String>,

    #[serde(default, rename = "customerName", alias = "name")]
    customer_name: Option<String>,

    #[serde(default, rename = "customerPhone", alias = "phone")]
    customer_phone: Option<String>,

    #[serde(default)]
    items: Option<serde_json::Value>,

    #[serde(default, rename = "totalAmount")]
    total_amount: Option<f64>,

    #[serde(default, alias = "Order Status")]
    status: Option<String>,

    #[serde(default, rename = "createdAt", alias = "timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    fn normalize(self) -> Order {
        let tracking_id = self.tracking_id.filter(|t| !t.is_empty()).unwrap_or_else(|| {
            let id = generate_tracking_id();
            tracing::warn!(tracking_id = %id, "Record had no tracking id, back-filled");
            id
        });

        let status = match self.status.as_deref() {
            None | Some("") => OrderStatus::Pending,
            Some(s) => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    tracking_id = %tracking_id,
                    status = %s,
                    "Unknown persisted status, defaulting to Pending"
                );
                OrderStatus::Pending
            }),
        };

        let items = decode_items(&tracking_id, self.items);
        let total_amount = self.total_amount.unwrap_or_else(|| total_of(&items));

        let created_at = self.created_at.unwrap_or_else(|| {
            tracing::warn!(tracking_id = %tracking_id, "Record had no creation time, using now");
            Utc::now()
        });

        Order {
            tracking_id,
            customer_name: self.customer_name.unwrap_or_default(),
            customer_phone: self.customer_phone.unwrap_or_default(),
            items,
            total_amount,
            status,
            created_at,
        }
    }
}

/// Item lists arrive either as a JSON array or as a string containing JSON
/// (the spreadsheet era stored them stringified). Malformed encodings
/// degrade to an empty list instead of failing the whole load.
fn decode_items(tracking_id: &str, value: Option<serde_json::Value>) -> Vec<LineItem> {
    let value = match value {
        None | Some(serde_json::Value::Null) => return Vec::new(),
        Some(serde_json::Value::String(s)) => match serde_json::from_str(&s) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    tracking_id = %tracking_id,
                    error = %e,
                    "Unparseable item encoding, quarantined as empty"
                );
                return Vec::new();
            }
        },
        Some(v) => v,
    };

    match value {
        serde_json::Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name").and_then(|n| n.as_str())?;
                let qty = entry.get("qty").and_then(lenient_number).unwrap_or(0.0);
                let price = entry.get("price").and_then(lenient_number).unwrap_or(0.0);
                Some(LineItem {
                    name: name.to_string(),
                    qty: qty.max(0.0).round() as u32,
                    price: price.max(0.0),
                })
            })
            .collect(),
        other => {
            tracing::warn!(
                tracking_id = %tracking_id,
                "Item field was not a sequence ({}), quarantined as empty",
                kind_of(&other)
            );
            Vec::new()
        }
    }
}

fn kind_of(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
