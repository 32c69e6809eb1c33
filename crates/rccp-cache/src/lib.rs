//! # RCCP Cache
//!
//! 產能快取與計劃狀態儲存

pub mod capacity_cache;
pub mod dirty_tracking;
pub mod store;

// Re-export 主要類型
pub use capacity_cache::{CacheStats, CapacityCache};
pub use dirty_tracking::DirtyTracker;
pub use store::PlanningStore;
