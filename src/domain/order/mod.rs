// ============================================================================
// Order Domain
// ============================================================================
//
// Everything order-specific lives here:
// - Value objects (LineItem, OrderStatus)
// - The Order record itself (with tracking-id generation)
// - Errors (OrderError enum)
//
// ============================================================================

pub mod value_objects;
pub mod model;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use model::*;
pub use errors::*;
