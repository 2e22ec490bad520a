// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// This module contains the order domain: value objects, the persisted order
// record, and the business-rule error taxonomy. It knows nothing about HTTP
// or the persistence substrate.
//
// ============================================================================

pub mod order;
