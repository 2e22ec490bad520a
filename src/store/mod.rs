// ============================================================================
// Order Store - Whole-Collection Persistence
// ============================================================================
//
// The full order collection is the single source of truth. Every mutation is
// a load-all / mutate / save-all pass; callers that mutate must serialize
// through the service's writer lock.
//
// ============================================================================

mod file_store;

pub use file_store::{FileOrderStore, StoreError};
