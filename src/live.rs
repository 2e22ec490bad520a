use tokio::sync::broadcast;

use crate::domain::order::Order;

// ============================================================================
// Live Update Channel
// ============================================================================
//
// Push-based order feed for connected dashboards. Publishing is
// fire-and-forget: there is no acknowledgment or redelivery, and a client
// that misses events resyncs through the snapshot it receives on connect.
//
// ============================================================================

/// Capacity of the broadcast ring. A subscriber that falls further behind
/// than this is disconnected and must reconnect for a fresh snapshot.
const FEED_CAPACITY: usize = 64;

/// One event on the live feed. Creation publishes the single new order;
/// status changes and resets publish the full collection.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    AllOrders(Vec<Order>),
    NewOrder(Order),
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::AllOrders(_) => "all-orders",
            FeedEvent::NewOrder(_) => "new-order",
        }
    }

    /// Encode as a Server-Sent Events frame.
    pub fn to_sse_frame(&self) -> String {
        let data = match self {
            FeedEvent::AllOrders(orders) => {
                serde_json::to_string(orders).unwrap_or_else(|_| "[]".to_string())
            }
            FeedEvent::NewOrder(order) => {
                serde_json::to_string(order).unwrap_or_else(|_| "{}".to_string())
            }
        };
        format!("event: {}\ndata: {}\n\n", self.name(), data)
    }
}

#[derive(Clone)]
pub struct LiveFeed {
    tx: broadcast::Sender<FeedEvent>,
}

impl LiveFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Best-effort broadcast. Having no connected viewers is normal and
    /// never an error for the caller.
    pub fn publish(&self, event: FeedEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "Broadcast live event");
            }
            Err(_) => {
                tracing::debug!(event = name, "No live subscribers, event dropped");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
