//! 平衡計劃與加班計劃模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CapacityError, Result};

/// 負荷移動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMove {
    /// 需求ID
    pub demand_id: String,

    /// 工作中心代碼
    pub work_center: String,

    /// 來源期間ID
    pub from_period: String,

    /// 目的期間ID
    pub to_period: String,

    /// 移動工時
    pub hours: Decimal,
}

/// 平衡計劃狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelingPlanState {
    /// 建議（尚未套用）
    Proposed,
    /// 已套用
    Applied,
}

/// 負荷平衡計劃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelingPlan {
    /// 計劃ID
    pub id: Uuid,

    /// 建立時所依據的快照版本
    pub base_revision: u64,

    /// 移動清單
    pub moves: Vec<LoadMove>,

    /// 優化分數（峰值利用率下降百分比）
    pub optimization_score: Decimal,

    /// 移動前峰值利用率
    pub peak_before: Decimal,

    /// 移動後峰值利用率
    pub peak_after: Decimal,

    /// 改善說明
    pub improvements: Vec<String>,

    /// 狀態
    pub state: LevelingPlanState,
}

impl LevelingPlan {
    /// 創建建議計劃
    pub fn proposed(base_revision: u64, moves: Vec<LoadMove>) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_revision,
            moves,
            optimization_score: Decimal::ZERO,
            peak_before: Decimal::ZERO,
            peak_after: Decimal::ZERO,
            improvements: Vec::new(),
            state: LevelingPlanState::Proposed,
        }
    }

    /// 移動工時合計
    pub fn total_hours_moved(&self) -> Decimal {
        self.moves.iter().map(|m| m.hours).sum()
    }

    /// 是否已套用
    pub fn is_applied(&self) -> bool {
        self.state == LevelingPlanState::Applied
    }
}

/// 加班審批狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// 已規劃（待審）
    Planned,
    /// 已核准
    Approved,
    /// 已駁回（終態）
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Planned => "planned",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// 加班計劃（每個工作中心 × 期間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimePlan {
    /// 計劃ID
    pub id: Uuid,

    /// 工作中心代碼
    pub work_center: String,

    /// 期間ID
    pub period_id: String,

    /// 正常產能工時
    pub regular_hours: Decimal,

    /// 加班工時
    pub overtime_hours: Decimal,

    /// 加班成本
    pub overtime_cost: Decimal,

    /// 加班上限截斷後仍未解決的缺口
    pub residual_shortfall: Decimal,

    /// 理由說明
    pub justification: String,

    /// 審批狀態
    pub status: ApprovalStatus,

    /// 審批人
    pub approver: Option<String>,

    /// 審批時間
    pub decided_at: Option<DateTime<Utc>>,
}

impl OvertimePlan {
    /// 加班是否因上限而被截斷
    pub fn is_capped(&self) -> bool {
        self.residual_shortfall > Decimal::ZERO
    }

    /// 是否仍佔用加班工時（已規劃或已核准）
    pub fn allocates_hours(&self) -> bool {
        self.status != ApprovalStatus::Rejected
    }

    /// 核准（僅限 Planned → Approved）
    pub fn approve(&mut self, approver: &str, at: DateTime<Utc>) -> Result<()> {
        self.transition(ApprovalStatus::Approved, approver, at)
    }

    /// 駁回（僅限 Planned → Rejected）
    pub fn reject(&mut self, approver: &str, at: DateTime<Utc>) -> Result<()> {
        self.transition(ApprovalStatus::Rejected, approver, at)
    }

    fn transition(&mut self, to: ApprovalStatus, approver: &str, at: DateTime<Utc>) -> Result<()> {
        if self.status != ApprovalStatus::Planned {
            return Err(CapacityError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        self.approver = Some(approver.to_string());
        self.decided_at = Some(at);
        Ok(())
    }
}
