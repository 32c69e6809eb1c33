//! # RCCP Calculation Engine
//!
//! 產能負荷計算引擎：可用產能、負荷彙總、利用率分類、瓶頸偵測

pub mod aggregation;
pub mod bottleneck;
pub mod capacity;
pub mod planner;
pub mod split;
pub mod utilization;

// Re-export 主要類型
pub use aggregation::{LoadAggregator, PeriodLoad};
pub use bottleneck::BottleneckDetector;
pub use capacity::{CapacityModel, CapacityProvider};
pub use planner::CapacityPlanner;
pub use split::{MachineLaborSplitAnalyzer, SplitAnalysis};
pub use utilization::{Classification, UtilizationClassifier};

use rccp_core::{Bottleneck, CapacityError, LoadSnapshot, LoadStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 計劃運算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRun {
    /// 負荷快照
    pub snapshot: LoadSnapshot,

    /// 瓶頸摘要
    pub bottlenecks: Vec<Bottleneck>,

    /// 被排除或需注意的記錄
    pub issues: Vec<PlanningIssue>,

    /// 總覽
    pub summary: CapacitySummary,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl PlanningRun {
    /// 指定嚴重程度的問題
    pub fn issues_with(&self, severity: IssueSeverity) -> impl Iterator<Item = &PlanningIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// 是否有錯誤層級的問題
    pub fn has_errors(&self) -> bool {
        self.issues_with(IssueSeverity::Error).next().is_some()
    }
}

/// 計劃運算問題
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningIssue {
    /// 相關記錄（工作中心代碼或需求ID）
    pub record_id: String,
    pub severity: IssueSeverity,
    /// 問題種類代碼
    pub kind: String,
    pub message: String,
}

impl PlanningIssue {
    pub fn new(record_id: String, severity: IssueSeverity, kind: &str, message: String) -> Self {
        Self {
            record_id,
            severity,
            kind: kind.to_string(),
            message,
        }
    }

    pub fn info(record_id: String, kind: &str, message: String) -> Self {
        Self::new(record_id, IssueSeverity::Info, kind, message)
    }

    pub fn warning(record_id: String, kind: &str, message: String) -> Self {
        Self::new(record_id, IssueSeverity::Warning, kind, message)
    }

    pub fn error(record_id: String, kind: &str, message: String) -> Self {
        Self::new(record_id, IssueSeverity::Error, kind, message)
    }

    /// 由錯誤建立問題；產能為零與加班上限屬於警告，其餘為錯誤
    pub fn from_error(record_id: &str, error: &CapacityError) -> Self {
        let severity = match error {
            CapacityError::InvalidCapacity { .. } | CapacityError::OvertimeCapExceeded { .. } => {
                IssueSeverity::Warning
            }
            _ => IssueSeverity::Error,
        };
        Self::new(record_id.to_string(), severity, error.kind(), error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

/// 產能總覽（儀表板指標）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacitySummary {
    pub work_centers: usize,
    pub total_available_hours: Decimal,
    pub total_required_hours: Decimal,

    /// 整體利用率（總需求 / 總可用）
    pub overall_utilization: Option<Decimal>,

    /// 期間平均利用率
    pub average_utilization: Option<Decimal>,

    pub peak_utilization: Option<Decimal>,

    pub ok_periods: usize,
    pub tight_periods: usize,
    pub moderate_overload_periods: usize,
    pub severe_overload_periods: usize,
    pub invalid_capacity_periods: usize,
}

impl CapacitySummary {
    /// 由快照彙總
    pub fn from_snapshot(snapshot: &LoadSnapshot) -> Self {
        let mut summary = Self {
            work_centers: snapshot.work_centers().len(),
            average_utilization: snapshot.average_utilization(),
            peak_utilization: snapshot.peak_utilization(None),
            ..Self::default()
        };

        for period in &snapshot.periods {
            summary.total_available_hours += period.available_hours;
            summary.total_required_hours += period.required_hours;
            match period.status {
                LoadStatus::Ok => summary.ok_periods += 1,
                LoadStatus::Tight => summary.tight_periods += 1,
                LoadStatus::ModerateOverload => summary.moderate_overload_periods += 1,
                LoadStatus::SevereOverload => summary.severe_overload_periods += 1,
                LoadStatus::InvalidCapacity => summary.invalid_capacity_periods += 1,
            }
        }

        if summary.total_available_hours > Decimal::ZERO {
            summary.overall_utilization = Some(
                summary.total_required_hours / summary.total_available_hours * Decimal::ONE_HUNDRED,
            );
        }

        summary
    }

    /// 超載期間數
    pub fn overloaded_periods(&self) -> usize {
        self.moderate_overload_periods + self.severe_overload_periods
    }
}
