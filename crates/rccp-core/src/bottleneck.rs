//! 瓶頸摘要模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 瓶頸嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    /// 單一期間的偶發超載
    Medium,
    /// 少數期間中度超載
    High,
    /// 嚴重超載、超載期間過半或產能無效
    Critical,
}

/// 緩解措施類型（依固定順序評估）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MitigationKind {
    /// 加班
    Overtime,
    /// 增加班次
    AddShift,
    /// 外包
    Outsource,
    /// 重新排程
    Reschedule,
    /// 資本投資（增購機台）
    CapitalInvestment,
}

/// 緩解建議（以實際缺口量化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationAction {
    pub kind: MitigationKind,

    /// 說明
    pub description: String,

    /// 涵蓋工時
    pub hours: Decimal,

    /// 預估成本
    pub estimated_cost: Decimal,
}

/// 瓶頸摘要（由負荷快照推導，唯讀）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    /// 工作中心代碼
    pub work_center: String,

    /// 平均利用率（%）
    pub avg_utilization: Decimal,

    /// 最大利用率（%）
    pub max_utilization: Decimal,

    /// 超載期間數
    pub overloaded_periods: usize,

    /// 產能無效期間數
    pub invalid_capacity_periods: usize,

    /// 超載工時合計
    pub total_overload_hours: Decimal,

    /// 受影響的需求ID
    pub impacted_demands: Vec<String>,

    /// 嚴重程度
    pub severity: BottleneckSeverity,

    /// 建議措施
    pub suggested_actions: Vec<MitigationAction>,
}

impl Bottleneck {
    /// 是否為嚴重瓶頸
    pub fn is_critical(&self) -> bool {
        self.severity == BottleneckSeverity::Critical
    }

    /// 查找指定類型的建議
    pub fn action(&self, kind: MitigationKind) -> Option<&MitigationAction> {
        self.suggested_actions.iter().find(|a| a.kind == kind)
    }
}
