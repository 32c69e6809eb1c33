//! # RCCP
//!
//! 粗略產能規劃（Rough-Cut Capacity Planning）引擎：
//! 產能負荷計算、瓶頸偵測、負荷平衡、加班計劃與假設情境評估。
//!
//! 各子 crate：
//! - `rccp_core`：資料模型與錯誤類型
//! - `rccp_calc`：可用產能、負荷彙總、利用率分類、瓶頸偵測
//! - `rccp_optimizer`：負荷平衡、加班計劃、假設情境
//! - `rccp_cache`：產能快取與計劃狀態儲存

pub mod logging;

pub use rccp_cache::{CapacityCache, PlanningStore};
pub use rccp_calc::{CapacityPlanner, CapacitySummary, IssueSeverity, PlanningIssue, PlanningRun};
pub use rccp_core::{CapacityError, Result};
pub use rccp_optimizer::{OvertimePlanner, ResourceLevelingOptimizer, ScenarioEvaluator};
