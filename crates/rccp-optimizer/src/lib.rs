//! # RCCP Optimizer
//!
//! 優化模組（負荷平衡、加班計劃、假設情境評估）

pub mod leveling;
pub mod overtime;
pub mod scenario;

// Re-export 主要類型
pub use leveling::ResourceLevelingOptimizer;
pub use overtime::OvertimePlanner;
pub use scenario::ScenarioEvaluator;
