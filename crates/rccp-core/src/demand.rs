//! 需求來源模型（工單/工序所需工時）

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CapacityError, Result};

/// 需求來源類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemandKind {
    /// 生產工單
    WorkOrder,
    /// 工序
    Operation,
    /// 預測
    Forecast,
}

/// 需求來源
///
/// 在 `[start, end]` 期間內於某工作中心需要的加工工時。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSource {
    /// 需求ID（工單/工序參考號）
    pub id: String,

    /// 工作中心代碼
    pub work_center: String,

    /// 所需工時
    pub required_hours: Decimal,

    /// 開始日期
    pub start: NaiveDate,

    /// 結束日期（含）
    pub end: NaiveDate,

    /// 最早允許開工日
    pub earliest_start: Option<NaiveDate>,

    /// 交期（所在期間即為交期期間）
    pub due_date: Option<NaiveDate>,

    /// 需求類型
    pub kind: DemandKind,

    /// 是否可被平衡移動（確認的工單不可移動）
    pub movable: bool,
}

impl DemandSource {
    /// 創建新的需求來源
    pub fn new(
        id: String,
        work_center: String,
        required_hours: Decimal,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            id,
            work_center,
            required_hours,
            start,
            end,
            earliest_start: None,
            due_date: None,
            kind: DemandKind::WorkOrder,
            movable: true,
        }
    }

    /// 建構器模式：設置最早允許開工日
    pub fn with_earliest_start(mut self, date: NaiveDate) -> Self {
        self.earliest_start = Some(date);
        self
    }

    /// 建構器模式：設置交期
    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// 建構器模式：設置需求類型
    pub fn with_kind(mut self, kind: DemandKind) -> Self {
        self.kind = kind;
        self
    }

    /// 建構器模式：設置為確認狀態（不可移動）
    pub fn as_firm(mut self) -> Self {
        self.movable = false;
        self
    }

    /// 需求期間日曆天數（含首尾）
    pub fn active_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 目的期間 `[start, end]` 是否落在允許範圍內
    ///
    /// 期間結束不可早於最早開工日，期間開始不可晚於交期。
    pub fn allows_period(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let after_earliest = self.earliest_start.map_or(true, |earliest| end >= earliest);
        let before_due = self.due_date.map_or(true, |due| start <= due);
        after_earliest && before_due
    }

    /// 交期寬裕天數（相對於指定日期）；無交期視為無限寬裕
    pub fn slack_days(&self, from: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - from).num_days())
    }

    /// 驗證需求記錄
    pub fn validate(&self) -> Result<()> {
        if self.required_hours < Decimal::ZERO {
            return Err(CapacityError::InvalidConfiguration(format!(
                "需求 {} 工時不可為負: {}",
                self.id, self.required_hours
            )));
        }
        if self.end < self.start {
            return Err(CapacityError::InvalidConfiguration(format!(
                "需求 {} 結束日期 {} 早於開始日期 {}",
                self.id, self.end, self.start
            )));
        }
        Ok(())
    }
}
