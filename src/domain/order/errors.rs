use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Customer name is required")]
    MissingName,

    #[error("Customer phone is required")]
    MissingPhone,

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Tracking ID not found: {0}")]
    NotFound(String),

    #[error("Unknown order status: {0:?}")]
    InvalidStatus(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
