use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::domain::order::{lenient_number, LineItem, Order, OrderError, OrderStatus};
use crate::live::{FeedEvent, LiveFeed};
use crate::metrics::Metrics;
use crate::store::{FileOrderStore, StoreError};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: request -> validate -> normalize -> persist -> broadcast.
//
// Every mutation is a load-all / mutate / save-all pass over the store.
// The writer lock serializes those passes so two interleaved mutations
// cannot silently drop each other's writes.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NewOrderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<NewLineItem>>,
}

/// One requested line item. Quantity and price are taken as raw JSON values
/// so numeric strings from older clients still coerce.
#[derive(Debug, Deserialize)]
pub struct NewLineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qty: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default, rename = "trackingId")]
    pub tracking_id: Option<String>,
    #[serde(default, rename = "newStatus")]
    pub new_status: Option<String>,
}

// ============================================================================
// Menu Catalog
// ============================================================================

/// Built-in menu: item id as sent by the storefront -> display name.
const MENU: &[(&str, &str)] = &[
    ("cp100", "Chicken Pickle (100 g)"),
    ("cp250", "Chicken Pickle (250 g)"),
    ("gulab", "Gulabjamun (Box of 6)"),
    ("nuvvula", "Black Nuvvula Laddu (Box of 6)"),
    ("murukulu", "Murukulu 150 g"),
];

fn menu_item_name(id: &str) -> Option<&'static str> {
    MENU.iter().find(|(key, _)| *key == id).map(|(_, name)| *name)
}

// ============================================================================
// Service
// ============================================================================

pub struct OrderService {
    store: FileOrderStore,
    feed: LiveFeed,
    metrics: Arc<Metrics>,
    write_lock: Mutex<()>,
}

impl OrderService {
    pub fn new(store: FileOrderStore, feed: LiveFeed, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            feed,
            metrics,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &FileOrderStore {
        &self.store
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.load_all().await?)
    }

    /// Validate and persist a new order, then broadcast it.
    /// Returns the generated tracking id.
    pub async fn create_order(&self, req: NewOrderRequest) -> Result<String, ServiceError> {
        let validated = self.validate(req)?;
        let order = Order::new(validated.name, validated.phone, validated.items);
        let tracking_id = order.tracking_id.clone();

        {
            let _guard = self.write_lock.lock().await;
            let mut orders = self.store.load_all().await?;
            orders.push(order.clone());
            self.store.save_all(&orders).await?;
        }

        self.metrics.orders_created_total.inc();
        tracing::info!(
            tracking_id = %tracking_id,
            customer = %order.customer_name,
            total = order.total_amount,
            "Order created"
        );

        self.feed.publish(FeedEvent::NewOrder(order));
        Ok(tracking_id)
    }

    /// Move an existing order forward in its lifecycle, then broadcast the
    /// full updated collection.
    pub async fn update_status(&self, req: StatusUpdateRequest) -> Result<(), ServiceError> {
        let tracking_id = req
            .tracking_id
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| self.reject(OrderError::MissingField("trackingId")))?;
        let raw_status = req
            .new_status
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| self.reject(OrderError::MissingField("newStatus")))?;

        let new_status: OrderStatus = raw_status
            .parse()
            .map_err(|_| self.reject(OrderError::InvalidStatus(raw_status.clone())))?;

        let orders = {
            let _guard = self.write_lock.lock().await;
            let mut orders = self.store.load_all().await?;

            let order = orders
                .iter_mut()
                .find(|o| o.tracking_id == tracking_id)
                .ok_or_else(|| self.reject(OrderError::NotFound(tracking_id.clone())))?;

            if !order.status.can_advance_to(new_status) {
                return Err(self
                    .reject(OrderError::InvalidTransition {
                        from: order.status,
                        to: new_status,
                    })
                    .into());
            }
            order.status = new_status;

            self.store.save_all(&orders).await?;
            orders
        };

        self.metrics
            .status_updates_total
            .with_label_values(&[&new_status.to_string()])
            .inc();
        tracing::info!(
            tracking_id = %tracking_id,
            status = %new_status,
            "Order status updated"
        );

        self.feed.publish(FeedEvent::AllOrders(orders));
        Ok(())
    }

    /// Administrative reset: wipe the collection and tell every viewer.
    pub async fn clear_orders(&self) -> Result<(), ServiceError> {
        {
            let _guard = self.write_lock.lock().await;
            self.store.save_all(&[]).await?;
        }

        tracing::warn!("All orders cleared by admin");
        self.feed.publish(FeedEvent::AllOrders(Vec::new()));
        Ok(())
    }

    fn validate(&self, req: NewOrderRequest) -> Result<ValidatedOrder, OrderError> {
        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| self.reject(OrderError::MissingName))?;
        let phone = req
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| self.reject(OrderError::MissingPhone))?;

        let raw_items = req.items.unwrap_or_default();
        if raw_items.is_empty() {
            return Err(self.reject(OrderError::EmptyItems));
        }

        Ok(ValidatedOrder {
            name,
            phone,
            items: normalize_items(raw_items),
        })
    }

    /// Count the rejection and hand the error back for propagation.
    fn reject(&self, err: OrderError) -> OrderError {
        self.metrics
            .orders_rejected_total
            .with_label_values(&[rejection_reason(&err)])
            .inc();
        err
    }
}

struct ValidatedOrder {
    name: String,
    phone: String,
    items: Vec<LineItem>,
}

fn rejection_reason(err: &OrderError) -> &'static str {
    match err {
        OrderError::MissingName | OrderError::MissingPhone => "missing-customer-field",
        OrderError::EmptyItems => "empty-items",
        OrderError::MissingField(_) => "missing-field",
        OrderError::NotFound(_) => "not-found",
        OrderError::InvalidStatus(_) => "invalid-status",
        OrderError::InvalidTransition { .. } => "invalid-transition",
    }
}

/// Lenient normalization: quantity defaults to 1 and price to 0 when
/// missing or non-numeric, both clamped non-negative. Display name comes
/// from the menu catalog by id, then the supplied name, then a placeholder.
fn normalize_items(items: Vec<NewLineItem>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|item| {
            let name = item
                .id
                .as_deref()
                .and_then(menu_item_name)
                .map(str::to_string)
                .or_else(|| item.name.filter(|n| !n.trim().is_empty()))
                .unwrap_or_else(|| "Unnamed Item".to_string());

            let qty = item.qty.as_ref().and_then(lenient_number).unwrap_or(1.0);
            let price = item.price.as_ref().and_then(lenient_number).unwrap_or(0.0);

            LineItem {
                name,
                qty: qty.max(0.0).round() as u32,
                price: price.max(0.0),
            }
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &tempfile::TempDir) -> OrderService {
        OrderService::new(
            FileOrderStore::new(dir.path().join("orders.json")),
            LiveFeed::new(),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    fn tea_order() -> NewOrderRequest {
        NewOrderRequest {
            name: Some("A".to_string()),
            phone: Some("123".to_string()),
            items: Some(vec![NewLineItem {
                id: None,
                name: Some("Tea".to_string()),
                qty: Some(json!(2)),
                price: Some(json!(10)),
            }]),
        }
    }

    #[tokio::test]
    async fn test_create_order_persists_pending_with_total() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let tracking_id = service.create_order(tea_order()).await.unwrap();
        assert!(tracking_id.starts_with("TID"));

        let orders = service.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].tracking_id, tracking_id);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].total_amount, 20.0);
    }

    #[tokio::test]
    async fn test_empty_items_rejected_and_nothing_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let req = NewOrderRequest {
            items: Some(vec![]),
            ..tea_order()
        };
        let err = service.create_order(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::EmptyItems)));

        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_customer_fields_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let no_name = NewOrderRequest {
            name: Some("   ".to_string()),
            ..tea_order()
        };
        assert!(matches!(
            service.create_order(no_name).await.unwrap_err(),
            ServiceError::Order(OrderError::MissingName)
        ));

        let no_phone = NewOrderRequest {
            phone: None,
            ..tea_order()
        };
        assert!(matches!(
            service.create_order(no_phone).await.unwrap_err(),
            ServiceError::Order(OrderError::MissingPhone)
        ));
    }

    #[tokio::test]
    async fn test_item_normalization_defaults_and_menu_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let req = NewOrderRequest {
            name: Some("B".to_string()),
            phone: Some("456".to_string()),
            items: Some(vec![
                // Known menu id, stringly-typed qty, no price.
                NewLineItem {
                    id: Some("gulab".to_string()),
                    name: None,
                    qty: Some(json!("3")),
                    price: None,
                },
                // No id, no name, negative price.
                NewLineItem {
                    id: None,
                    name: None,
                    qty: None,
                    price: Some(json!(-5)),
                },
            ]),
        };
        service.create_order(req).await.unwrap();

        let orders = service.list_orders().await.unwrap();
        let items = &orders[0].items;

        assert_eq!(items[0].name, "Gulabjamun (Box of 6)");
        assert_eq!(items[0].qty, 3);
        assert_eq!(items[0].price, 0.0);

        assert_eq!(items[1].name, "Unnamed Item");
        assert_eq!(items[1].qty, 1);
        assert_eq!(items[1].price, 0.0);
    }

    #[tokio::test]
    async fn test_create_publishes_new_order_event() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        let mut rx = service.feed().subscribe();

        let tracking_id = service.create_order(tea_order()).await.unwrap();

        match rx.recv().await.unwrap() {
            FeedEvent::NewOrder(order) => assert_eq!(order.tracking_id, tracking_id),
            other => panic!("expected new-order, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_update_status_persists_and_broadcasts_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let tracking_id = service.create_order(tea_order()).await.unwrap();
        let mut rx = service.feed().subscribe();

        service
            .update_status(StatusUpdateRequest {
                tracking_id: Some(tracking_id.clone()),
                new_status: Some("Delivered".to_string()),
            })
            .await
            .unwrap();

        let orders = service.list_orders().await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Delivered);

        match rx.recv().await.unwrap() {
            FeedEvent::AllOrders(snapshot) => {
                assert_eq!(snapshot.len(), 1);
                assert_eq!(snapshot[0].status, OrderStatus::Delivered);
            }
            other => panic!("expected all-orders, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_update_unknown_tracking_id_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        service.create_order(tea_order()).await.unwrap();
        let before = service.list_orders().await.unwrap();

        let err = service
            .update_status(StatusUpdateRequest {
                tracking_id: Some("TID-does-not-exist".to_string()),
                new_status: Some("Delivered".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::NotFound(_))));

        assert_eq!(service.list_orders().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_missing_fields_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let err = service
            .update_status(StatusUpdateRequest {
                tracking_id: None,
                new_status: Some("Delivered".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Order(OrderError::MissingField("trackingId"))
        ));
    }

    #[tokio::test]
    async fn test_backward_and_unknown_status_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let tracking_id = service.create_order(tea_order()).await.unwrap();
        service
            .update_status(StatusUpdateRequest {
                tracking_id: Some(tracking_id.clone()),
                new_status: Some("Delivered".to_string()),
            })
            .await
            .unwrap();

        let backward = service
            .update_status(StatusUpdateRequest {
                tracking_id: Some(tracking_id.clone()),
                new_status: Some("Pending".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            backward,
            ServiceError::Order(OrderError::InvalidTransition { .. })
        ));

        let unknown = service
            .update_status(StatusUpdateRequest {
                tracking_id: Some(tracking_id),
                new_status: Some("Teleported".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            unknown,
            ServiceError::Order(OrderError::InvalidStatus(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_orders_empties_store_and_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        service.create_order(tea_order()).await.unwrap();
        let mut rx = service.feed().subscribe();

        service.clear_orders().await.unwrap();

        assert!(service.list_orders().await.unwrap().is_empty());
        match rx.recv().await.unwrap() {
            FeedEvent::AllOrders(snapshot) => assert!(snapshot.is_empty()),
            other => panic!("expected all-orders, got {}", other.name()),
        }
    }

    #[test]
    fn test_menu_lookup() {
        assert_eq!(menu_item_name("cp100"), Some("Chicken Pickle (100 g)"));
        assert_eq!(menu_item_name("nope"), None);
    }
}
