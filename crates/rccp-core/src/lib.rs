//! # RCCP Core
//!
//! 產能負荷平衡引擎的核心資料模型與類型定義

pub mod bottleneck;
pub mod calendar;
pub mod demand;
pub mod load;
pub mod period;
pub mod plan;
pub mod policy;
pub mod scenario;
pub mod work_center;

// Re-export 主要類型
pub use bottleneck::{Bottleneck, BottleneckSeverity, MitigationAction, MitigationKind};
pub use calendar::WorkCalendar;
pub use demand::{DemandKind, DemandSource};
pub use load::{LoadPeriod, LoadSnapshot, LoadStatus};
pub use period::PlanningPeriod;
pub use plan::{
    ApprovalStatus, LevelingPlan, LevelingPlanState, LoadMove, OvertimePlan,
};
pub use policy::{
    FeasibilityThresholds, LevelingConstraints, PlanningPolicy, UtilizationThresholds,
};
pub use scenario::{CapacityChange, ChangeKind, Feasibility, Scenario, ScenarioImpact, ScenarioRequest};
pub use work_center::{LaborProfile, WorkCenter, WorkCenterStatus};

/// 產能規劃錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapacityError {
    #[error("無效的產能配置: {0}")]
    InvalidConfiguration(String),

    #[error("找不到工作中心: {0}")]
    UnknownWorkCenter(String),

    #[error("工作中心 {work_center} 於期間 {period_id} 可用產能為零")]
    InvalidCapacity {
        work_center: String,
        period_id: String,
    },

    #[error("找不到可改善的負荷移動: {0}")]
    Infeasible(String),

    #[error("違反平衡約束: {0}")]
    ConstraintViolation(String),

    #[error("加班需求 {requested} 小時超過上限 {cap} 小時（工作中心 {work_center}，期間 {period_id}）")]
    OvertimeCapExceeded {
        work_center: String,
        period_id: String,
        requested: rust_decimal::Decimal,
        cap: rust_decimal::Decimal,
    },

    #[error("快照版本衝突: 預期 {expected}，實際 {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("無效的狀態轉換: {from} → {to}")]
    InvalidTransition { from: String, to: String },

    #[error("找不到記錄: {0}")]
    NotFound(String),
}

impl CapacityError {
    /// 錯誤種類代碼（供報表與問題清單使用）
    pub fn kind(&self) -> &'static str {
        match self {
            CapacityError::InvalidConfiguration(_) => "InvalidConfiguration",
            CapacityError::UnknownWorkCenter(_) => "UnknownWorkCenter",
            CapacityError::InvalidCapacity { .. } => "InvalidCapacity",
            CapacityError::Infeasible(_) => "Infeasible",
            CapacityError::ConstraintViolation(_) => "ConstraintViolation",
            CapacityError::OvertimeCapExceeded { .. } => "OvertimeCapExceeded",
            CapacityError::VersionConflict { .. } => "VersionConflict",
            CapacityError::InvalidTransition { .. } => "InvalidTransition",
            CapacityError::NotFound(_) => "NotFound",
        }
    }
}

pub type Result<T> = std::result::Result<T, CapacityError>;
