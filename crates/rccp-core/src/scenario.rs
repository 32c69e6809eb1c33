//! 假設情境（What-if）模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 產能變更類型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChangeKind {
    /// 增加班次；成本為評估期間內每班人工成本
    AddShift {
        shifts: u32,
        labor_cost_per_shift: Decimal,
    },
    /// 增加機台；有攤提期數時按期攤提，否則一次性計入
    AddMachine {
        machines: u32,
        capital_cost_per_machine: Decimal,
        amortization_periods: Option<u32>,
    },
    /// 調整效率係數
    Efficiency { new_factor: Decimal },
    /// 外包工時；未指定費率時使用政策外包費率
    Outsource { hours: Decimal, rate: Option<Decimal> },
}

/// 單一產能變更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityChange {
    /// 目標工作中心
    pub work_center: String,

    /// 變更內容
    pub change: ChangeKind,
}

impl CapacityChange {
    pub fn new(work_center: String, change: ChangeKind) -> Self {
        Self { work_center, change }
    }
}

/// 情境評估請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    /// 情境名稱
    pub name: String,

    /// 說明
    pub description: Option<String>,

    /// 產能變更
    pub changes: Vec<CapacityChange>,
}

impl ScenarioRequest {
    /// 創建新的情境請求
    pub fn new(name: String) -> Self {
        Self {
            name,
            description: None,
            changes: Vec::new(),
        }
    }

    /// 建構器模式：設置說明
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// 建構器模式：添加變更
    pub fn with_change(mut self, change: CapacityChange) -> Self {
        self.changes.push(change);
        self
    }
}

/// 可行性評級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feasibility {
    High,
    Medium,
    Low,
}

/// 情境影響
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    /// 產能增加（每週工時；外包以轉出工時計）
    pub capacity_increase: Decimal,

    /// 整個計劃期間的產能增加工時
    pub horizon_capacity_increase: Decimal,

    /// 成本增加
    pub cost_increase: Decimal,

    /// 平均利用率變化（百分點）
    pub utilization_change: Decimal,

    /// 解除的瓶頸數
    pub bottlenecks_resolved: usize,

    /// 新出現的瓶頸工作中心
    pub new_bottlenecks: Vec<String>,
}

/// 已評估的情境（評估後不可變）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// 情境ID
    pub id: Uuid,

    /// 名稱
    pub name: String,

    /// 說明
    pub description: Option<String>,

    /// 產能變更
    pub changes: Vec<CapacityChange>,

    /// 評估所依據的快照版本
    pub baseline_revision: u64,

    /// 影響
    pub impact: ScenarioImpact,

    /// 可行性
    pub feasibility: Feasibility,
}
